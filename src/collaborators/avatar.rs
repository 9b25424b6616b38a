use async_trait::async_trait;

use crate::collaborators::AvatarLookup;
use crate::errors::InternalError;

/// Leaves accounts without a default image
#[derive(Debug, Default)]
pub struct NoAvatarLookup;

#[async_trait]
impl AvatarLookup for NoAvatarLookup {
    async fn lookup(&self, _email: &str) -> Result<Option<String>, InternalError> {
        Ok(None)
    }
}
