use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EmailGroups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EmailGroups::Title).string().not_null().primary_key())
                    .col(ColumnDef::new(EmailGroups::Owner).string().not_null())
                    .col(ColumnDef::new(EmailGroups::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EmailGroupMembers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EmailGroupMembers::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(EmailGroupMembers::EmailGroup).string().not_null())
                    .col(ColumnDef::new(EmailGroupMembers::Email).string().not_null())
                    .col(ColumnDef::new(EmailGroupMembers::Unsubscribed).boolean().not_null().default(false))
                    .col(ColumnDef::new(EmailGroupMembers::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(EmailGroupMembers::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_group_members_group_email")
                    .table(EmailGroupMembers::Table)
                    .col(EmailGroupMembers::EmailGroup)
                    .col(EmailGroupMembers::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Newsletters::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Newsletters::Subject).string().not_null().primary_key())
                    .col(ColumnDef::new(Newsletters::EmailGroup).string().not_null())
                    .col(ColumnDef::new(Newsletters::Message).text().not_null())
                    .col(ColumnDef::new(Newsletters::SendFrom).string().null())
                    .col(ColumnDef::new(Newsletters::Status).string().not_null().default("Draft"))
                    .col(ColumnDef::new(Newsletters::Owner).string().not_null())
                    .col(ColumnDef::new(Newsletters::ModifiedBy).string().not_null())
                    .col(ColumnDef::new(Newsletters::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Newsletters::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Newsletters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailGroupMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailGroups::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum EmailGroups {
    Table,
    Title,
    Owner,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EmailGroupMembers {
    Table,
    Id,
    EmailGroup,
    Email,
    Unsubscribed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Newsletters {
    Table,
    Subject,
    EmailGroup,
    Message,
    SendFrom,
    Status,
    Owner,
    ModifiedBy,
    CreatedAt,
    UpdatedAt,
}
