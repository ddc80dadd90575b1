use sea_orm_migration::prelude::*;

use crate::m20260301_000002_split_expenses::SplitExpenses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum SplitShares {
    Table,
    Id,
    SplitExpenseId,
    Position,
    UserId,
    AmountMinor,
    IsPaid,
    PaidAt,
    InterestRateBps,
    InterestAccruedMinor,
    NextReminderDate,
    ReminderFrequency,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SplitShares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitShares::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SplitShares::SplitExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitShares::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SplitShares::UserId).string().not_null())
                    .col(ColumnDef::new(SplitShares::AmountMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(SplitShares::IsPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SplitShares::PaidAt).timestamp())
                    .col(
                        ColumnDef::new(SplitShares::InterestRateBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SplitShares::InterestAccruedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SplitShares::NextReminderDate).timestamp())
                    .col(ColumnDef::new(SplitShares::ReminderFrequency).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_shares-split_expense_id")
                            .from(SplitShares::Table, SplitShares::SplitExpenseId)
                            .to(SplitExpenses::Table, SplitExpenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-split_shares-split_expense_id-user_id")
                    .table(SplitShares::Table)
                    .col(SplitShares::SplitExpenseId)
                    .col(SplitShares::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_shares-user_id")
                    .table(SplitShares::Table)
                    .col(SplitShares::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SplitShares::Table).to_owned())
            .await?;
        Ok(())
    }
}
