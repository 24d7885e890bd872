use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_menu_items_table::Migration),
            Box::new(m20240201_000002_create_orders_table::Migration),
            Box::new(m20240201_000003_create_order_items_table::Migration),
            Box::new(m20240201_000004_create_coupons_table::Migration),
        ]
    }
}

mod m20240201_000001_create_menu_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000001_create_menu_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MenuItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MenuItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MenuItems::Name).string().not_null())
                        .col(ColumnDef::new(MenuItems::Description).text().null())
                        .col(ColumnDef::new(MenuItems::Price).big_integer().not_null())
                        .col(ColumnDef::new(MenuItems::Category).string().null())
                        .col(
                            ColumnDef::new(MenuItems::Available)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(MenuItems::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(MenuItems::PreparationTimeMinutes)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(MenuItems::ImageUrl).string().null())
                        .col(ColumnDef::new(MenuItems::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(MenuItems::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MenuItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MenuItems {
        Table,
        Id,
        Name,
        Description,
        Price,
        Category,
        Available,
        StockQuantity,
        PreparationTimeMinutes,
        ImageUrl,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000002_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000002_create_orders_table"
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
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::TokenNumber).integer().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::CouponCode).string().null())
                        .col(ColumnDef::new(Orders::DiscountAmount).big_integer().null())
                        .col(ColumnDef::new(Orders::OtpCode).string_len(8).null())
                        .col(ColumnDef::new(Orders::OtpExpiresAt).timestamp().null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::CompletedAt).timestamp().null())
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            // The dashboard queries scan by status and by time window.
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_completed_at")
                        .table(Orders::Table)
                        .col(Orders::CompletedAt)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
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

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        TokenNumber,
        Status,
        TotalAmount,
        CouponCode,
        DiscountAmount,
        OtpCode,
        OtpExpiresAt,
        CustomerId,
        CustomerEmail,
        CreatedAt,
        CompletedAt,
        Version,
    }
}

mod m20240201_000003_create_order_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000003_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        // Weak reference by design: menu items may be deleted later
                        // without touching order history.
                        .col(ColumnDef::new(OrderItems::MenuItemId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .big_integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_menu_item_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::MenuItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        MenuItemId,
        Name,
        Quantity,
        UnitPrice,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
    }
}

mod m20240201_000004_create_coupons_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000004_create_coupons_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Coupons::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Coupons::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Coupons::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Coupons::DiscountPercentage)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Coupons::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(Coupons::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Coupons::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Coupons::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Coupons {
        Table,
        Id,
        Code,
        DiscountPercentage,
        ExpiryDate,
        Active,
        CreatedAt,
    }
}
