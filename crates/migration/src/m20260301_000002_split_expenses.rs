use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub(crate) enum SplitExpenses {
    Table,
    Id,
    GroupId,
    ExpenseId,
    CreatedBy,
    TotalAmountMinor,
    SplitType,
    SettlementPriority,
    GraceEndDate,
    CustomSplitRules,
    NeedsApproval,
    DueDate,
    IdempotencyKey,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SplitExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitExpenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SplitExpenses::GroupId).string().not_null())
                    .col(ColumnDef::new(SplitExpenses::ExpenseId).string().not_null())
                    .col(ColumnDef::new(SplitExpenses::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(SplitExpenses::TotalAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SplitExpenses::SplitType).string().not_null())
                    .col(
                        ColumnDef::new(SplitExpenses::SettlementPriority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SplitExpenses::GraceEndDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitExpenses::CustomSplitRules)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitExpenses::NeedsApproval)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SplitExpenses::DueDate).timestamp().not_null())
                    .col(ColumnDef::new(SplitExpenses::IdempotencyKey).string())
                    .col(ColumnDef::new(SplitExpenses::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(SplitExpenses::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_expenses-created_by")
                    .table(SplitExpenses::Table)
                    .col(SplitExpenses::CreatedBy)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-split_expenses-created_by-idempotency_key")
                    .table(SplitExpenses::Table)
                    .col(SplitExpenses::CreatedBy)
                    .col(SplitExpenses::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SplitExpenses::Table).to_owned())
            .await?;
        Ok(())
    }
}
