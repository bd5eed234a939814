use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_customer_tables::Migration),
            Box::new(m20250101_000002_create_inventory_tables::Migration),
            Box::new(m20250101_000003_create_sales_tables::Migration),
            Box::new(m20250101_000004_create_procurement_tables::Migration),
            Box::new(m20250101_000005_create_repair_tables::Migration),
            Box::new(m20250101_000006_create_payment_tables::Migration),
            Box::new(m20250101_000007_create_finance_tables::Migration),
            Box::new(m20250101_000008_create_settings_and_sms_tables::Migration),
            Box::new(m20250101_000009_create_diagnostic_tables::Migration),
        ]
    }
}

mod m20250101_000001_create_customer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_customer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(
                            ColumnDef::new(Customers::Phone)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Customers::Email).string().null())
                        .col(ColumnDef::new(Customers::Gender).string_len(16).null())
                        .col(ColumnDef::new(Customers::City).string().null())
                        .col(ColumnDef::new(Customers::Whatsapp).string_len(32).null())
                        .col(
                            ColumnDef::new(Customers::LoyaltyLevel)
                                .string_len(16)
                                .not_null()
                                .default("bronze"),
                        )
                        .col(
                            ColumnDef::new(Customers::Points)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Customers::ColorTag)
                                .string_len(16)
                                .not_null()
                                .default("new"),
                        )
                        .col(
                            ColumnDef::new(Customers::TotalSpent)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Customers::TotalOrders)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Customers::LastVisit)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Customers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customers_loyalty_level")
                        .table(Customers::Table)
                        .col(Customers::LoyaltyLevel)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerPointsHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerPointsHistory::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CustomerPointsHistory::CustomerId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerPointsHistory::PointsChange)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerPointsHistory::TransactionType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerPointsHistory::Reason)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CustomerPointsHistory::DeviceId).uuid().null())
                        .col(
                            ColumnDef::new(CustomerPointsHistory::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerPointsHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_points_history_customer")
                                .from(
                                    CustomerPointsHistory::Table,
                                    CustomerPointsHistory::CustomerId,
                                )
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_points_history_customer_id")
                        .table(CustomerPointsHistory::Table)
                        .col(CustomerPointsHistory::CustomerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomerPointsHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        Name,
        Phone,
        Email,
        Gender,
        City,
        Whatsapp,
        LoyaltyLevel,
        Points,
        ColorTag,
        TotalSpent,
        TotalOrders,
        LastVisit,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CustomerPointsHistory {
        Table,
        Id,
        CustomerId,
        PointsChange,
        TransactionType,
        Reason,
        DeviceId,
        CreatedBy,
        CreatedAt,
    }
}

mod m20250101_000002_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Barcode).string().null())
                        .col(ColumnDef::new(Products::Category).string().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                        .col(
                            ColumnDef::new(ProductVariants::Sku)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProductVariants::Price).decimal().not_null())
                        .col(
                            ColumnDef::new(ProductVariants::CostPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::MinQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_variants_product")
                                .from(ProductVariants::Table, ProductVariants::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_variants_product_id")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::VariantId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(StockMovements::PreviousQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::NewQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Reason).string().not_null())
                        .col(ColumnDef::new(StockMovements::Reference).string().null())
                        .col(ColumnDef::new(StockMovements::Notes).text().null())
                        .col(ColumnDef::new(StockMovements::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_variant_id")
                        .table(StockMovements::Table)
                        .col(StockMovements::VariantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(InventoryItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(InventoryItems::VariantId).uuid().null())
                        .col(ColumnDef::new(InventoryItems::PurchaseOrderId).uuid().null())
                        .col(
                            ColumnDef::new(InventoryItems::SerialNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(InventoryItems::Imei).string().null())
                        .col(ColumnDef::new(InventoryItems::MacAddress).string().null())
                        .col(ColumnDef::new(InventoryItems::Barcode).string().null())
                        .col(ColumnDef::new(InventoryItems::Location).string().null())
                        .col(
                            ColumnDef::new(InventoryItems::Status)
                                .string_len(16)
                                .not_null()
                                .default("available"),
                        )
                        .col(ColumnDef::new(InventoryItems::Notes).text().null())
                        .col(ColumnDef::new(InventoryItems::CostPrice).decimal().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_product_id")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SerialNumberMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SerialNumberMovements::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(SerialNumberMovements::InventoryItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerialNumberMovements::MovementType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerialNumberMovements::Reference)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SerialNumberMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_serial_movements_item")
                                .from(
                                    SerialNumberMovements::Table,
                                    SerialNumberMovements::InventoryItemId,
                                )
                                .to(InventoryItems::Table, InventoryItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                SerialNumberMovements::Table.into_iden(),
                InventoryItems::Table.into_iden(),
                StockMovements::Table.into_iden(),
                ProductVariants::Table.into_iden(),
                Products::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Description,
        Sku,
        Barcode,
        Category,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductVariants {
        Table,
        Id,
        ProductId,
        Name,
        Sku,
        Price,
        CostPrice,
        Quantity,
        MinQuantity,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        ProductId,
        VariantId,
        MovementType,
        Quantity,
        PreviousQuantity,
        NewQuantity,
        Reason,
        Reference,
        Notes,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
        ProductId,
        VariantId,
        PurchaseOrderId,
        SerialNumber,
        Imei,
        MacAddress,
        Barcode,
        Location,
        Status,
        Notes,
        CostPrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SerialNumberMovements {
        Table,
        Id,
        InventoryItemId,
        MovementType,
        Reference,
        CreatedAt,
    }
}

mod m20250101_000003_create_sales_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_sales_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Sales::SaleNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Sales::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Sales::CustomerName).string().null())
                        .col(ColumnDef::new(Sales::CustomerPhone).string_len(32).null())
                        .col(ColumnDef::new(Sales::Subtotal).decimal().not_null())
                        .col(
                            ColumnDef::new(Sales::DiscountAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Sales::DiscountType).string_len(16).null())
                        .col(ColumnDef::new(Sales::DiscountValue).decimal().null())
                        .col(ColumnDef::new(Sales::Tax).decimal().not_null().default(0))
                        .col(ColumnDef::new(Sales::TotalAmount).decimal().not_null())
                        .col(ColumnDef::new(Sales::PaymentMethod).json().not_null())
                        .col(ColumnDef::new(Sales::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Sales::CreatedBy).string().not_null())
                        .col(ColumnDef::new(Sales::Notes).text().null())
                        .col(
                            ColumnDef::new(Sales::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_created_at")
                        .table(Sales::Table)
                        .col(Sales::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SaleItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(SaleItems::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(SaleItems::SaleId).uuid().not_null())
                        .col(ColumnDef::new(SaleItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(SaleItems::VariantId).uuid().not_null())
                        .col(ColumnDef::new(SaleItems::ProductName).string().not_null())
                        .col(ColumnDef::new(SaleItems::VariantName).string().not_null())
                        .col(ColumnDef::new(SaleItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(SaleItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(SaleItems::TotalPrice).decimal().not_null())
                        .col(ColumnDef::new(SaleItems::CostPrice).decimal().not_null())
                        .col(ColumnDef::new(SaleItems::Profit).decimal().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_items_sale")
                                .from(SaleItems::Table, SaleItems::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Receipts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Receipts::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Receipts::SaleId).uuid().not_null().unique_key())
                        .col(ColumnDef::new(Receipts::ReceiptNumber).string().not_null())
                        .col(ColumnDef::new(Receipts::CustomerName).string().not_null())
                        .col(ColumnDef::new(Receipts::CustomerPhone).string_len(32).null())
                        .col(ColumnDef::new(Receipts::TotalAmount).decimal().not_null())
                        .col(ColumnDef::new(Receipts::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Receipts::ItemsCount).integer().not_null())
                        .col(ColumnDef::new(Receipts::GeneratedBy).string().not_null())
                        .col(
                            ColumnDef::new(Receipts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                Receipts::Table.into_iden(),
                SaleItems::Table.into_iden(),
                Sales::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
        SaleNumber,
        CustomerId,
        CustomerName,
        CustomerPhone,
        Subtotal,
        DiscountAmount,
        DiscountType,
        DiscountValue,
        Tax,
        TotalAmount,
        PaymentMethod,
        Status,
        CreatedBy,
        Notes,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SaleItems {
        Table,
        Id,
        SaleId,
        ProductId,
        VariantId,
        ProductName,
        VariantName,
        Quantity,
        UnitPrice,
        TotalPrice,
        CostPrice,
        Profit,
    }

    #[derive(DeriveIden)]
    enum Receipts {
        Table,
        Id,
        SaleId,
        ReceiptNumber,
        CustomerName,
        CustomerPhone,
        TotalAmount,
        PaymentMethod,
        ItemsCount,
        GeneratedBy,
        CreatedAt,
    }
}

mod m20250101_000004_create_procurement_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_procurement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Suppliers::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::ContactPerson).string().null())
                        .col(ColumnDef::new(Suppliers::Phone).string_len(32).null())
                        .col(ColumnDef::new(Suppliers::Email).string().null())
                        .col(
                            ColumnDef::new(Suppliers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::OrderNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::SupplierId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::Status)
                                .string_len(32)
                                .not_null()
                                .default("draft"),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::Currency)
                                .string_len(8)
                                .not_null()
                                .default("TZS"),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::TotalAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::ExpectedDelivery).date().null())
                        .col(ColumnDef::new(PurchaseOrders::Notes).text().null())
                        .col(ColumnDef::new(PurchaseOrders::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_orders_supplier")
                                .from(PurchaseOrders::Table, PurchaseOrders::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_orders_status")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrderItems::VariantId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrderItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::ReceivedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::CostPrice)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_po_items_purchase_order")
                                .from(
                                    PurchaseOrderItems::Table,
                                    PurchaseOrderItems::PurchaseOrderId,
                                )
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryAdjustments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryAdjustments::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::VariantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::AdjustmentType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::CostPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::Reason)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::AdjustedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryAdjustments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_adjustments_po_id")
                        .table(InventoryAdjustments::Table)
                        .col(InventoryAdjustments::PurchaseOrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderPayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::PaymentMethod)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::Amount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::Currency)
                                .string_len(8)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::Reference)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderPayments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderAudit::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderAudit::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderAudit::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderAudit::Action).string().not_null())
                        .col(ColumnDef::new(PurchaseOrderAudit::UserId).string().not_null())
                        .col(ColumnDef::new(PurchaseOrderAudit::Details).json().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrderAudit::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderMessages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderMessages::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderMessages::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderMessages::Sender)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderMessages::Content)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderMessages::MessageType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderMessages::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderQualityChecks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderQualityChecks::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderQualityChecks::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderQualityChecks::ItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderQualityChecks::Passed)
                                .boolean()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderQualityChecks::Notes).text().null())
                        .col(
                            ColumnDef::new(PurchaseOrderQualityChecks::CheckedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderQualityChecks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                PurchaseOrderQualityChecks::Table.into_iden(),
                PurchaseOrderMessages::Table.into_iden(),
                PurchaseOrderAudit::Table.into_iden(),
                PurchaseOrderPayments::Table.into_iden(),
                InventoryAdjustments::Table.into_iden(),
                PurchaseOrderItems::Table.into_iden(),
                PurchaseOrders::Table.into_iden(),
                Suppliers::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Suppliers {
        Table,
        Id,
        Name,
        ContactPerson,
        Phone,
        Email,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        Id,
        OrderNumber,
        SupplierId,
        Status,
        Currency,
        TotalAmount,
        ExpectedDelivery,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderItems {
        Table,
        Id,
        PurchaseOrderId,
        ProductId,
        VariantId,
        Quantity,
        ReceivedQuantity,
        CostPrice,
    }

    #[derive(DeriveIden)]
    enum InventoryAdjustments {
        Table,
        Id,
        PurchaseOrderId,
        ProductId,
        VariantId,
        AdjustmentType,
        Quantity,
        CostPrice,
        Reason,
        AdjustedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderPayments {
        Table,
        Id,
        PurchaseOrderId,
        PaymentMethod,
        Amount,
        Currency,
        Status,
        Reference,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderAudit {
        Table,
        Id,
        PurchaseOrderId,
        Action,
        UserId,
        Details,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderMessages {
        Table,
        Id,
        PurchaseOrderId,
        Sender,
        Content,
        MessageType,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderQualityChecks {
        Table,
        Id,
        PurchaseOrderId,
        ItemId,
        Passed,
        Notes,
        CheckedBy,
        CreatedAt,
    }
}

mod m20250101_000005_create_repair_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_repair_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Devices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Devices::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Devices::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Devices::Brand).string().not_null())
                        .col(ColumnDef::new(Devices::Model).string().not_null())
                        .col(ColumnDef::new(Devices::SerialNumber).string().null())
                        .col(ColumnDef::new(Devices::IssueDescription).text().not_null())
                        .col(ColumnDef::new(Devices::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Devices::AssignedTo).string().null())
                        .col(ColumnDef::new(Devices::ExpectedReturnDate).date().not_null())
                        .col(
                            ColumnDef::new(Devices::RepairPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Devices::RepairCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Devices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Devices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_status")
                        .table(Devices::Table)
                        .col(Devices::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_assigned_to")
                        .table(Devices::Table)
                        .col(Devices::AssignedTo)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DeviceTransitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeviceTransitions::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DeviceTransitions::DeviceId).uuid().not_null())
                        .col(
                            ColumnDef::new(DeviceTransitions::FromStatus)
                                .string_len(32)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeviceTransitions::ToStatus)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeviceTransitions::PerformedBy)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeviceTransitions::Notes).text().null())
                        .col(
                            ColumnDef::new(DeviceTransitions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_device_transitions_device")
                                .from(DeviceTransitions::Table, DeviceTransitions::DeviceId)
                                .to(Devices::Table, Devices::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SpareParts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(SpareParts::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(SpareParts::Name).string().not_null())
                        .col(
                            ColumnDef::new(SpareParts::PartNumber)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(SpareParts::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SpareParts::MinQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(SpareParts::CostPrice).decimal().not_null())
                        .col(ColumnDef::new(SpareParts::SellingPrice).decimal().not_null())
                        .col(
                            ColumnDef::new(SpareParts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RepairParts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(RepairParts::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(RepairParts::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(RepairParts::SparePartId).uuid().not_null())
                        .col(
                            ColumnDef::new(RepairParts::QuantityNeeded)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RepairParts::QuantityUsed)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(RepairParts::CostPerUnit).decimal().not_null())
                        .col(ColumnDef::new(RepairParts::Status).string_len(16).not_null())
                        .col(ColumnDef::new(RepairParts::Notes).text().null())
                        .col(
                            ColumnDef::new(RepairParts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_repair_parts_device")
                                .from(RepairParts::Table, RepairParts::DeviceId)
                                .to(Devices::Table, Devices::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_repair_parts_device_id")
                        .table(RepairParts::Table)
                        .col(RepairParts::DeviceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                RepairParts::Table.into_iden(),
                SpareParts::Table.into_iden(),
                DeviceTransitions::Table.into_iden(),
                Devices::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Devices {
        Table,
        Id,
        CustomerId,
        Brand,
        Model,
        SerialNumber,
        IssueDescription,
        Status,
        AssignedTo,
        ExpectedReturnDate,
        RepairPrice,
        RepairCount,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DeviceTransitions {
        Table,
        Id,
        DeviceId,
        FromStatus,
        ToStatus,
        PerformedBy,
        Notes,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SpareParts {
        Table,
        Id,
        Name,
        PartNumber,
        Quantity,
        MinQuantity,
        CostPrice,
        SellingPrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum RepairParts {
        Table,
        Id,
        DeviceId,
        SparePartId,
        QuantityNeeded,
        QuantityUsed,
        CostPerUnit,
        Status,
        Notes,
        CreatedAt,
    }
}

mod m20250101_000006_create_payment_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_payment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CustomerPayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerPayments::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CustomerPayments::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(CustomerPayments::DeviceId).uuid().null())
                        .col(ColumnDef::new(CustomerPayments::SaleId).uuid().null())
                        .col(ColumnDef::new(CustomerPayments::Amount).decimal().not_null())
                        .col(
                            ColumnDef::new(CustomerPayments::Method)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerPayments::PaymentType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerPayments::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CustomerPayments::Reference).string().null())
                        .col(ColumnDef::new(CustomerPayments::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(CustomerPayments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customer_payments_customer_id")
                        .table(CustomerPayments::Table)
                        .col(CustomerPayments::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MobileMoneyOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MobileMoneyOrders::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MobileMoneyOrders::OrderId)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(MobileMoneyOrders::CustomerId).uuid().null())
                        .col(ColumnDef::new(MobileMoneyOrders::SaleId).uuid().null())
                        .col(
                            ColumnDef::new(MobileMoneyOrders::BuyerEmail)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MobileMoneyOrders::BuyerName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MobileMoneyOrders::BuyerPhone)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(MobileMoneyOrders::Amount).decimal().not_null())
                        .col(
                            ColumnDef::new(MobileMoneyOrders::PaymentStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(MobileMoneyOrders::Reference).string().null())
                        .col(ColumnDef::new(MobileMoneyOrders::Metadata).json().not_null())
                        .col(
                            ColumnDef::new(MobileMoneyOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MobileMoneyOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentPerformanceMetrics::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentPerformanceMetrics::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PaymentPerformanceMetrics::Provider)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentPerformanceMetrics::Operation)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentPerformanceMetrics::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentPerformanceMetrics::LatencyMs)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentPerformanceMetrics::Error).text().null())
                        .col(
                            ColumnDef::new(PaymentPerformanceMetrics::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_metrics_created_at")
                        .table(PaymentPerformanceMetrics::Table)
                        .col(PaymentPerformanceMetrics::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentSecurityAlerts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentSecurityAlerts::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PaymentSecurityAlerts::AlertType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSecurityAlerts::Severity)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSecurityAlerts::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentSecurityAlerts::CustomerId).uuid().null())
                        .col(ColumnDef::new(PaymentSecurityAlerts::PaymentId).uuid().null())
                        .col(
                            ColumnDef::new(PaymentSecurityAlerts::Description)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSecurityAlerts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentSecurityAlerts::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                PaymentSecurityAlerts::Table.into_iden(),
                PaymentPerformanceMetrics::Table.into_iden(),
                MobileMoneyOrders::Table.into_iden(),
                CustomerPayments::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum CustomerPayments {
        Table,
        Id,
        CustomerId,
        DeviceId,
        SaleId,
        Amount,
        Method,
        PaymentType,
        Status,
        Reference,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum MobileMoneyOrders {
        Table,
        Id,
        OrderId,
        CustomerId,
        SaleId,
        BuyerEmail,
        BuyerName,
        BuyerPhone,
        Amount,
        PaymentStatus,
        Reference,
        Metadata,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PaymentPerformanceMetrics {
        Table,
        Id,
        Provider,
        Operation,
        Status,
        LatencyMs,
        Error,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PaymentSecurityAlerts {
        Table,
        Id,
        AlertType,
        Severity,
        Status,
        CustomerId,
        PaymentId,
        Description,
        CreatedAt,
        ResolvedAt,
    }
}

mod m20250101_000007_create_finance_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_finance_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FinanceAccounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FinanceAccounts::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FinanceAccounts::Name).string().not_null())
                        .col(
                            ColumnDef::new(FinanceAccounts::AccountType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FinanceAccounts::Balance)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(FinanceAccounts::AccountNumber).string().null())
                        .col(ColumnDef::new(FinanceAccounts::BankName).string().null())
                        .col(
                            ColumnDef::new(FinanceAccounts::Currency)
                                .string_len(8)
                                .not_null()
                                .default("TZS"),
                        )
                        .col(
                            ColumnDef::new(FinanceAccounts::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(FinanceAccounts::IsPaymentMethod)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(FinanceAccounts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FinanceExpenses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FinanceExpenses::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FinanceExpenses::AccountId).uuid().not_null())
                        .col(ColumnDef::new(FinanceExpenses::Category).string().not_null())
                        .col(ColumnDef::new(FinanceExpenses::Description).text().not_null())
                        .col(ColumnDef::new(FinanceExpenses::Amount).decimal().not_null())
                        .col(ColumnDef::new(FinanceExpenses::ExpenseDate).date().not_null())
                        .col(ColumnDef::new(FinanceExpenses::Reference).string().null())
                        .col(ColumnDef::new(FinanceExpenses::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(FinanceExpenses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_expenses_account")
                                .from(FinanceExpenses::Table, FinanceExpenses::AccountId)
                                .to(FinanceAccounts::Table, FinanceAccounts::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FinanceTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FinanceTransfers::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(FinanceTransfers::FromAccountId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FinanceTransfers::ToAccountId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FinanceTransfers::Amount).decimal().not_null())
                        .col(ColumnDef::new(FinanceTransfers::Description).text().null())
                        .col(ColumnDef::new(FinanceTransfers::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(FinanceTransfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                FinanceTransfers::Table.into_iden(),
                FinanceExpenses::Table.into_iden(),
                FinanceAccounts::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum FinanceAccounts {
        Table,
        Id,
        Name,
        AccountType,
        Balance,
        AccountNumber,
        BankName,
        Currency,
        IsActive,
        IsPaymentMethod,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum FinanceExpenses {
        Table,
        Id,
        AccountId,
        Category,
        Description,
        Amount,
        ExpenseDate,
        Reference,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum FinanceTransfers {
        Table,
        Id,
        FromAccountId,
        ToAccountId,
        Amount,
        Description,
        CreatedBy,
        CreatedAt,
    }
}

mod m20250101_000008_create_settings_and_sms_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000008_create_settings_and_sms_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Settings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Settings::Key)
                                .string_len(128)
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Settings::Value).text().not_null())
                        .col(
                            ColumnDef::new(Settings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SmsLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(SmsLogs::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(SmsLogs::PhoneNumber).string_len(32).not_null())
                        .col(ColumnDef::new(SmsLogs::Message).text().not_null())
                        .col(ColumnDef::new(SmsLogs::Status).string_len(16).not_null())
                        .col(ColumnDef::new(SmsLogs::ErrorMessage).text().null())
                        .col(
                            ColumnDef::new(SmsLogs::SentAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(SmsLogs::SentBy).string().null())
                        .col(ColumnDef::new(SmsLogs::DeviceId).uuid().null())
                        .col(ColumnDef::new(SmsLogs::Cost).decimal().null())
                        .col(
                            ColumnDef::new(SmsLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sms_logs_created_at")
                        .table(SmsLogs::Table)
                        .col(SmsLogs::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SmsLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Settings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Settings {
        Table,
        Key,
        Value,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SmsLogs {
        Table,
        Id,
        PhoneNumber,
        Message,
        Status,
        ErrorMessage,
        SentAt,
        SentBy,
        DeviceId,
        Cost,
        CreatedAt,
    }
}

mod m20250101_000009_create_diagnostic_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000009_create_diagnostic_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DiagnosticRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DiagnosticRequests::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DiagnosticRequests::Title).string().not_null())
                        .col(ColumnDef::new(DiagnosticRequests::Notes).text().null())
                        .col(
                            ColumnDef::new(DiagnosticRequests::Priority)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticRequests::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DiagnosticRequests::CreatedBy).string().not_null())
                        .col(ColumnDef::new(DiagnosticRequests::AssignedTo).string().null())
                        .col(
                            ColumnDef::new(DiagnosticRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_diagnostic_requests_status")
                        .table(DiagnosticRequests::Table)
                        .col(DiagnosticRequests::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DiagnosticDevices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DiagnosticDevices::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DiagnosticDevices::RequestId).uuid().not_null())
                        .col(ColumnDef::new(DiagnosticDevices::DeviceName).string().not_null())
                        .col(ColumnDef::new(DiagnosticDevices::SerialNumber).string().null())
                        .col(ColumnDef::new(DiagnosticDevices::Model).string().null())
                        .col(ColumnDef::new(DiagnosticDevices::Notes).text().null())
                        .col(
                            ColumnDef::new(DiagnosticDevices::ResultStatus)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DiagnosticDevices::AdminFeedback).text().null())
                        .col(
                            ColumnDef::new(DiagnosticDevices::NextAction)
                                .string_len(16)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticDevices::FeedbackSubmittedBy)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticDevices::FeedbackSubmittedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(DiagnosticDevices::RepairNotes).text().null())
                        .col(
                            ColumnDef::new(DiagnosticDevices::RepairCompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticDevices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticDevices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_diagnostic_devices_request")
                                .from(DiagnosticDevices::Table, DiagnosticDevices::RequestId)
                                .to(DiagnosticRequests::Table, DiagnosticRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_diagnostic_devices_request_id")
                        .table(DiagnosticDevices::Table)
                        .col(DiagnosticDevices::RequestId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DiagnosticChecks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DiagnosticChecks::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DiagnosticChecks::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(DiagnosticChecks::TestItem).string().not_null())
                        .col(
                            ColumnDef::new(DiagnosticChecks::Result)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DiagnosticChecks::Remarks).text().null())
                        .col(ColumnDef::new(DiagnosticChecks::ImageUrl).text().null())
                        .col(
                            ColumnDef::new(DiagnosticChecks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticChecks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_diagnostic_checks_device")
                                .from(DiagnosticChecks::Table, DiagnosticChecks::DeviceId)
                                .to(DiagnosticDevices::Table, DiagnosticDevices::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DiagnosticTemplates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DiagnosticTemplates::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticTemplates::DeviceType)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticTemplates::ChecklistItems)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticTemplates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiagnosticTemplates::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DiagnosticTemplates::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DiagnosticChecks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DiagnosticDevices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DiagnosticRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DiagnosticRequests {
        Table,
        Id,
        Title,
        Notes,
        Priority,
        Status,
        CreatedBy,
        AssignedTo,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DiagnosticDevices {
        Table,
        Id,
        RequestId,
        DeviceName,
        SerialNumber,
        Model,
        Notes,
        ResultStatus,
        AdminFeedback,
        NextAction,
        FeedbackSubmittedBy,
        FeedbackSubmittedAt,
        RepairNotes,
        RepairCompletedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DiagnosticChecks {
        Table,
        Id,
        DeviceId,
        TestItem,
        Result,
        Remarks,
        ImageUrl,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DiagnosticTemplates {
        Table,
        Id,
        DeviceType,
        ChecklistItems,
        CreatedAt,
        UpdatedAt,
    }
}
