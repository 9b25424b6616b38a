use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Role registry
        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Roles::Name).string().not_null().primary_key())
                    .col(ColumnDef::new(Roles::DeskAccess).boolean().not_null().default(false))
                    .col(ColumnDef::new(Roles::Disabled).boolean().not_null().default(false))
                    .col(ColumnDef::new(Roles::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Roles::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Accounts
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Name).string().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::Email).string().not_null())
                    .col(ColumnDef::new(Accounts::FirstName).string().null())
                    .col(ColumnDef::new(Accounts::LastName).string().null())
                    .col(ColumnDef::new(Accounts::FullName).string().not_null().default(""))
                    .col(ColumnDef::new(Accounts::Enabled).boolean().not_null().default(true))
                    .col(ColumnDef::new(Accounts::UserType).string().not_null())
                    .col(ColumnDef::new(Accounts::Username).string().null().unique_key())
                    .col(ColumnDef::new(Accounts::UserImage).string().null())
                    .col(ColumnDef::new(Accounts::ExternalId).string().null())
                    .col(ColumnDef::new(Accounts::ResetPasswordKey).string().null())
                    .col(ColumnDef::new(Accounts::ResetKeyIssuedAt).big_integer().null())
                    .col(ColumnDef::new(Accounts::RedirectUrl).string().null())
                    .col(ColumnDef::new(Accounts::Language).string().null())
                    .col(ColumnDef::new(Accounts::SimultaneousSessions).integer().not_null().default(1))
                    .col(ColumnDef::new(Accounts::SendWelcomeEmail).boolean().not_null().default(true))
                    .col(ColumnDef::new(Accounts::SendPasswordUpdateNotification).boolean().not_null().default(false))
                    .col(ColumnDef::new(Accounts::Owner).string().not_null())
                    .col(ColumnDef::new(Accounts::ModifiedBy).string().not_null())
                    .col(ColumnDef::new(Accounts::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Accounts::Version).big_integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_reset_password_key")
                    .table(Accounts::Table)
                    .col(Accounts::ResetPasswordKey)
                    .to_owned(),
            )
            .await?;

        // Role assignments, ordered per account
        manager
            .create_table(
                Table::create()
                    .table(AccountRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AccountRoles::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(AccountRoles::Account).string().not_null())
                    .col(ColumnDef::new(AccountRoles::Role).string().not_null())
                    .col(ColumnDef::new(AccountRoles::Idx).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_account_roles_account_role")
                    .table(AccountRoles::Table)
                    .col(AccountRoles::Account)
                    .col(AccountRoles::Role)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Password hashes (argon2)
        manager
            .create_table(
                Table::create()
                    .table(Credentials::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Credentials::Account).string().not_null().primary_key())
                    .col(ColumnDef::new(Credentials::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Credentials::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Sharing ledger
        manager
            .create_table(
                Table::create()
                    .table(DocShares::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DocShares::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(DocShares::ShareDoctype).string().not_null())
                    .col(ColumnDef::new(DocShares::ShareName).string().not_null())
                    .col(ColumnDef::new(DocShares::Account).string().not_null())
                    .col(ColumnDef::new(DocShares::Read).boolean().not_null().default(true))
                    .col(ColumnDef::new(DocShares::Write).boolean().not_null().default(false))
                    .col(ColumnDef::new(DocShares::Share).boolean().not_null().default(false))
                    .col(ColumnDef::new(DocShares::Owner).string().not_null())
                    .col(ColumnDef::new(DocShares::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Ephemeral records owned by accounts
        manager
            .create_table(
                Table::create()
                    .table(Todos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Todos::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Todos::Owner).string().not_null())
                    .col(ColumnDef::new(Todos::AssignedBy).string().null())
                    .col(ColumnDef::new(Todos::Description).string().not_null())
                    .col(ColumnDef::new(Todos::Status).string().not_null().default("Open"))
                    .col(ColumnDef::new(Todos::ModifiedBy).string().not_null())
                    .col(ColumnDef::new(Todos::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Events::Owner).string().not_null())
                    .col(ColumnDef::new(Events::Subject).string().not_null())
                    .col(ColumnDef::new(Events::EventType).string().not_null().default("Private"))
                    .col(ColumnDef::new(Events::ModifiedBy).string().not_null())
                    .col(ColumnDef::new(Events::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Communications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Communications::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Communications::Owner).string().not_null())
                    .col(ColumnDef::new(Communications::CommunicationType).string().not_null())
                    .col(ColumnDef::new(Communications::ReferenceDoctype).string().null())
                    .col(ColumnDef::new(Communications::ReferenceName).string().null())
                    .col(ColumnDef::new(Communications::Content).string().not_null())
                    .col(ColumnDef::new(Communications::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Communications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Todos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DocShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Credentials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Name,
    DeskAccess,
    Disabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Name,
    Email,
    FirstName,
    LastName,
    FullName,
    Enabled,
    UserType,
    Username,
    UserImage,
    ExternalId,
    ResetPasswordKey,
    ResetKeyIssuedAt,
    RedirectUrl,
    Language,
    SimultaneousSessions,
    SendWelcomeEmail,
    SendPasswordUpdateNotification,
    Owner,
    ModifiedBy,
    CreatedAt,
    UpdatedAt,
    Version,
}

#[derive(DeriveIden)]
enum AccountRoles {
    Table,
    Id,
    Account,
    Role,
    Idx,
}

#[derive(DeriveIden)]
enum Credentials {
    Table,
    Account,
    PasswordHash,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DocShares {
    Table,
    Id,
    ShareDoctype,
    ShareName,
    Account,
    Read,
    Write,
    Share,
    Owner,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Todos {
    Table,
    Id,
    Owner,
    AssignedBy,
    Description,
    Status,
    ModifiedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Owner,
    Subject,
    EventType,
    ModifiedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Communications {
    Table,
    Id,
    Owner,
    CommunicationType,
    ReferenceDoctype,
    ReferenceName,
    Content,
    CreatedAt,
}
