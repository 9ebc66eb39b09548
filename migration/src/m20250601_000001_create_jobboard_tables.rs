use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Companies::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Companies::Name).string().not_null())
                    .col(ColumnDef::new(Companies::NameFolded).string().not_null())
                    .col(ColumnDef::new(Companies::Website).string())
                    .col(ColumnDef::new(Companies::Description).text())
                    .col(ColumnDef::new(Companies::Location).string())
                    .col(ColumnDef::new(Companies::Industry).string())
                    .col(ColumnDef::new(Companies::Size).string())
                    .col(
                        ColumnDef::new(Companies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Companies::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Name).string())
                    .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                    .col(ColumnDef::new(Users::CompanyId).uuid())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-users-company_id")
                            .from(Users::Table, Users::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Jobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Jobs::Title).string().not_null())
                    .col(ColumnDef::new(Jobs::Description).text().not_null())
                    .col(ColumnDef::new(Jobs::TitleFolded).string().not_null())
                    .col(ColumnDef::new(Jobs::DescriptionFolded).text().not_null())
                    .col(ColumnDef::new(Jobs::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Jobs::Location).string())
                    .col(ColumnDef::new(Jobs::Salary).string())
                    .col(ColumnDef::new(Jobs::JobType).string_len(20).not_null())
                    .col(ColumnDef::new(Jobs::Requirements).json().not_null())
                    .col(ColumnDef::new(Jobs::Benefits).json().not_null())
                    .col(ColumnDef::new(Jobs::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Jobs::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Jobs::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-jobs-company_id")
                            .from(Jobs::Table, Jobs::CompanyId)
                            .to(Companies::Table, Companies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-jobs-active-created_at")
                    .table(Jobs::Table)
                    .col(Jobs::IsActive)
                    .col(Jobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Applications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Applications::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Applications::UserId).uuid().not_null())
                    .col(ColumnDef::new(Applications::JobId).uuid().not_null())
                    .col(ColumnDef::new(Applications::Status).string_len(20).not_null())
                    .col(ColumnDef::new(Applications::CoverLetter).text())
                    .col(ColumnDef::new(Applications::Resume).string())
                    .col(
                        ColumnDef::new(Applications::AppliedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Applications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-applications-user_id")
                            .from(Applications::Table, Applications::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-applications-job_id")
                            .from(Applications::Table, Applications::JobId)
                            .to(Jobs::Table, Jobs::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One application per (user, job).
        manager
            .create_index(
                Index::create()
                    .name("idx-applications-user_id-job_id")
                    .table(Applications::Table)
                    .col(Applications::UserId)
                    .col(Applications::JobId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Applications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    Name,
    NameFolded,
    Website,
    Description,
    Location,
    Industry,
    Size,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Name,
    Role,
    CompanyId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    Title,
    Description,
    TitleFolded,
    DescriptionFolded,
    CompanyId,
    Location,
    Salary,
    JobType,
    Requirements,
    Benefits,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Applications {
    Table,
    Id,
    UserId,
    JobId,
    Status,
    CoverLetter,
    Resume,
    AppliedAt,
    UpdatedAt,
}
