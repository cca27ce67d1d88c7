use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_orders_table::Migration),
            Box::new(m20240101_000002_create_order_meta_table::Migration),
            Box::new(m20240101_000003_create_order_notes_table::Migration),
            Box::new(m20240101_000004_create_customer_links_table::Migration),
        ]
    }
}

mod m20240101_000001_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .big_integer()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerAccountId).big_integer())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string())
                        .col(ColumnDef::new(Orders::TotalAmount).decimal().not_null())
                        .col(ColumnDef::new(Orders::Currency).string().not_null())
                        .col(ColumnDef::new(Orders::BillingFirstName).string().not_null())
                        .col(ColumnDef::new(Orders::BillingLastName).string().not_null())
                        .col(ColumnDef::new(Orders::BillingCompany).string())
                        .col(ColumnDef::new(Orders::BillingEmail).string().not_null())
                        .col(ColumnDef::new(Orders::BillingPhone).string())
                        .col(ColumnDef::new(Orders::BillingAddress1).string())
                        .col(ColumnDef::new(Orders::BillingAddress2).string())
                        .col(ColumnDef::new(Orders::BillingNeighborhood).string())
                        .col(ColumnDef::new(Orders::BillingCity).string())
                        .col(ColumnDef::new(Orders::BillingState).string())
                        .col(ColumnDef::new(Orders::BillingPostcode).string())
                        .col(ColumnDef::new(Orders::TransactionId).string())
                        .col(ColumnDef::new(Orders::PaidAt).timestamp_with_time_zone())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerAccountId,
        Status,
        PaymentMethod,
        TotalAmount,
        Currency,
        BillingFirstName,
        BillingLastName,
        BillingCompany,
        BillingEmail,
        BillingPhone,
        #[iden = "billing_address_1"]
        BillingAddress1,
        #[iden = "billing_address_2"]
        BillingAddress2,
        BillingNeighborhood,
        BillingCity,
        BillingState,
        BillingPostcode,
        TransactionId,
        PaidAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_order_meta_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_order_meta_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderMeta::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderMeta::OrderId).big_integer().not_null())
                        .col(ColumnDef::new(OrderMeta::MetaKey).string().not_null())
                        .col(ColumnDef::new(OrderMeta::MetaValue).text().not_null())
                        .primary_key(
                            Index::create()
                                .col(OrderMeta::OrderId)
                                .col(OrderMeta::MetaKey),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderMeta::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum OrderMeta {
        Table,
        OrderId,
        MetaKey,
        MetaValue,
    }
}

mod m20240101_000003_create_order_notes_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_order_notes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderNotes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderNotes::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderNotes::OrderId).big_integer().not_null())
                        .col(ColumnDef::new(OrderNotes::Note).text().not_null())
                        .col(
                            ColumnDef::new(OrderNotes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_notes_order_id")
                        .table(OrderNotes::Table)
                        .col(OrderNotes::OrderId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderNotes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum OrderNotes {
        Table,
        Id,
        OrderId,
        Note,
        CreatedAt,
    }
}

mod m20240101_000004_create_customer_links_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_customer_links_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CustomerLinks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerLinks::AccountId)
                                .big_integer()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerLinks::RemoteCustomerId)
                                .string()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomerLinks::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum CustomerLinks {
        Table,
        AccountId,
        RemoteCustomerId,
    }
}
