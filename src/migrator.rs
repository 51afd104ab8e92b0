use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000002_create_inventory_tables::Migration),
            Box::new(m20240301_000003_create_picking_order_tables::Migration),
            Box::new(m20240301_000004_create_wave_tables::Migration),
            Box::new(m20240301_000005_create_receiving_tables::Migration),
        ]
    }
}

mod m20240301_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tenants::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tenants::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tenants::Name).string().not_null())
                        .col(
                            ColumnDef::new(Tenants::PickingRule)
                                .string_len(16)
                                .not_null()
                                .default("FIFO"),
                        )
                        .col(
                            ColumnDef::new(Tenants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tenants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Products::Sku).string_len(100).not_null())
                        .col(ColumnDef::new(Products::Description).string().not_null())
                        .col(
                            ColumnDef::new(Products::UnitOfMeasure)
                                .string_len(16)
                                .not_null(),
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
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_tenant_sku")
                        .table(Products::Table)
                        .col(Products::TenantId)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseZones::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseZones::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseZones::Code)
                                .string_len(16)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(WarehouseZones::Name).string().not_null())
                        .col(
                            ColumnDef::new(WarehouseZones::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseLocations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseLocations::ZoneId).uuid().not_null())
                        .col(ColumnDef::new(WarehouseLocations::TenantId).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseLocations::Code)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(WarehouseLocations::LocationType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseLocations::Status)
                                .string_len(16)
                                .not_null()
                                .default("available"),
                        )
                        .col(
                            ColumnDef::new(WarehouseLocations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseLocations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_locations_zone_id")
                                .from(WarehouseLocations::Table, WarehouseLocations::ZoneId)
                                .to(WarehouseZones::Table, WarehouseZones::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_locations_zone_id")
                        .table(WarehouseLocations::Table)
                        .col(WarehouseLocations::ZoneId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseLocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WarehouseZones::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Tenants::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Tenants {
        Table,
        Id,
        Name,
        PickingRule,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        TenantId,
        Sku,
        Description,
        UnitOfMeasure,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum WarehouseZones {
        Table,
        Id,
        Code,
        Name,
        CreatedAt,
    }

    #[derive(Iden)]
    enum WarehouseLocations {
        Table,
        Id,
        ZoneId,
        TenantId,
        Code,
        LocationType,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_inventory_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Inventory::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Inventory::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Inventory::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Inventory::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Inventory::LocationId).uuid().not_null())
                        .col(ColumnDef::new(Inventory::Batch).string_len(64).null())
                        .col(ColumnDef::new(Inventory::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(Inventory::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Inventory::ReservedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Inventory::Status)
                                .string_len(16)
                                .not_null()
                                .default("available"),
                        )
                        .col(
                            ColumnDef::new(Inventory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Inventory::UpdatedAt)
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
                        .name("idx_inventory_location_product")
                        .table(Inventory::Table)
                        .col(Inventory::LocationId)
                        .col(Inventory::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_tenant_product")
                        .table(Inventory::Table)
                        .col(Inventory::TenantId)
                        .col(Inventory::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::TenantId).uuid().not_null())
                        .col(ColumnDef::new(InventoryMovements::ProductId).uuid().not_null())
                        .col(ColumnDef::new(InventoryMovements::Batch).string_len(64).null())
                        .col(ColumnDef::new(InventoryMovements::FromLocationId).uuid().null())
                        .col(ColumnDef::new(InventoryMovements::ToLocationId).uuid().null())
                        .col(ColumnDef::new(InventoryMovements::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(InventoryMovements::MovementType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::Reference).string().null())
                        .col(
                            ColumnDef::new(InventoryMovements::PerformedBy)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::Notes).text().null())
                        .col(
                            ColumnDef::new(InventoryMovements::CreatedAt)
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
                        .name("idx_inventory_movements_product")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Inventory::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Inventory {
        Table,
        Id,
        TenantId,
        ProductId,
        LocationId,
        Batch,
        ExpiryDate,
        Quantity,
        ReservedQuantity,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum InventoryMovements {
        Table,
        Id,
        TenantId,
        ProductId,
        Batch,
        FromLocationId,
        ToLocationId,
        Quantity,
        MovementType,
        Reference,
        PerformedBy,
        Notes,
        CreatedAt,
    }
}

mod m20240301_000003_create_picking_order_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_picking_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PickingOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PickingOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingOrders::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(PickingOrders::OrderNumber)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PickingOrders::CustomerOrderNumber)
                                .string_len(64)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PickingOrders::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(PickingOrders::WaveId).uuid().null())
                        .col(ColumnDef::new(PickingOrders::PickedBy).string().null())
                        .col(
                            ColumnDef::new(PickingOrders::PickedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PickingOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickingOrders::UpdatedAt)
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
                        .name("idx_picking_orders_status")
                        .table(PickingOrders::Table)
                        .col(PickingOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_picking_orders_wave_id")
                        .table(PickingOrders::Table)
                        .col(PickingOrders::WaveId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PickingOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PickingOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickingOrderItems::PickingOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingOrderItems::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(PickingOrderItems::RequestedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickingOrderItems::Unit)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingOrderItems::Batch).string_len(64).null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_picking_order_items_order_id")
                                .from(PickingOrderItems::Table, PickingOrderItems::PickingOrderId)
                                .to(PickingOrders::Table, PickingOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_picking_order_items_product")
                        .table(PickingOrderItems::Table)
                        .col(PickingOrderItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PickingOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PickingOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PickingOrders {
        Table,
        Id,
        TenantId,
        OrderNumber,
        CustomerOrderNumber,
        Status,
        WaveId,
        PickedBy,
        PickedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum PickingOrderItems {
        Table,
        Id,
        PickingOrderId,
        ProductId,
        RequestedQuantity,
        Unit,
        Batch,
    }
}

mod m20240301_000004_create_wave_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_wave_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PickingWaves::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PickingWaves::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingWaves::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(PickingWaves::WaveNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PickingWaves::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(PickingWaves::TotalOrders).integer().not_null())
                        .col(ColumnDef::new(PickingWaves::TotalItems).integer().not_null())
                        .col(ColumnDef::new(PickingWaves::TotalQuantity).integer().not_null())
                        .col(
                            ColumnDef::new(PickingWaves::PickingRule)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingWaves::CreatedBy).string().not_null())
                        .col(ColumnDef::new(PickingWaves::CompletedBy).string().null())
                        .col(
                            ColumnDef::new(PickingWaves::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PickingWaves::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickingWaves::UpdatedAt)
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
                        .name("idx_picking_waves_tenant_status")
                        .table(PickingWaves::Table)
                        .col(PickingWaves::TenantId)
                        .col(PickingWaves::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PickingWaveItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PickingWaveItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingWaveItems::WaveId).uuid().not_null())
                        .col(
                            ColumnDef::new(PickingWaveItems::PickingOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingWaveItems::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(PickingWaveItems::ProductSku)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingWaveItems::ProductName).string().not_null())
                        .col(
                            ColumnDef::new(PickingWaveItems::TotalQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickingWaveItems::PickedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PickingWaveItems::Unit).string_len(16).not_null())
                        .col(ColumnDef::new(PickingWaveItems::LocationId).uuid().null())
                        .col(
                            ColumnDef::new(PickingWaveItems::LocationCode)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingWaveItems::Batch).string_len(64).null())
                        .col(ColumnDef::new(PickingWaveItems::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(PickingWaveItems::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(PickingWaveItems::PickedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PickingWaveItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickingWaveItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_picking_wave_items_wave_id")
                                .from(PickingWaveItems::Table, PickingWaveItems::WaveId)
                                .to(PickingWaves::Table, PickingWaves::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_picking_wave_items_wave_id")
                        .table(PickingWaveItems::Table)
                        .col(PickingWaveItems::WaveId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LabelAssociations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LabelAssociations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LabelAssociations::LabelCode)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(LabelAssociations::ProductId).uuid().not_null())
                        .col(ColumnDef::new(LabelAssociations::Batch).string_len(64).null())
                        .col(
                            ColumnDef::new(LabelAssociations::UnitsPerBox)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(LabelAssociations::Status)
                                .string_len(16)
                                .not_null()
                                .default("available"),
                        )
                        .col(
                            ColumnDef::new(LabelAssociations::CreatedAt)
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
                        .name("idx_label_associations_product_batch")
                        .table(LabelAssociations::Table)
                        .col(LabelAssociations::ProductId)
                        .col(LabelAssociations::Batch)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LabelAssociations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PickingWaveItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PickingWaves::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PickingWaves {
        Table,
        Id,
        TenantId,
        WaveNumber,
        Status,
        TotalOrders,
        TotalItems,
        TotalQuantity,
        PickingRule,
        CreatedBy,
        CompletedBy,
        CompletedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum PickingWaveItems {
        Table,
        Id,
        WaveId,
        PickingOrderId,
        ProductId,
        ProductSku,
        ProductName,
        TotalQuantity,
        PickedQuantity,
        Unit,
        LocationId,
        LocationCode,
        Batch,
        ExpiryDate,
        Status,
        PickedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum LabelAssociations {
        Table,
        Id,
        LabelCode,
        ProductId,
        Batch,
        UnitsPerBox,
        Status,
        CreatedAt,
    }
}

mod m20240301_000005_create_receiving_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_receiving_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReceivingOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceivingOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceivingOrders::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(ReceivingOrders::OrderNumber)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ReceivingOrders::Status)
                                .string_len(16)
                                .not_null()
                                .default("scheduled"),
                        )
                        .col(
                            ColumnDef::new(ReceivingOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReceivingPreallocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceivingPreallocations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::ReceivingOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::LocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::Batch)
                                .string_len(64)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::ExecutedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingPreallocations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_receiving_preallocations_order_id")
                                .from(
                                    ReceivingPreallocations::Table,
                                    ReceivingPreallocations::ReceivingOrderId,
                                )
                                .to(ReceivingOrders::Table, ReceivingOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receiving_preallocations_order_status")
                        .table(ReceivingPreallocations::Table)
                        .col(ReceivingPreallocations::ReceivingOrderId)
                        .col(ReceivingPreallocations::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReceivingPreallocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ReceivingOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ReceivingOrders {
        Table,
        Id,
        TenantId,
        OrderNumber,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ReceivingPreallocations {
        Table,
        Id,
        ReceivingOrderId,
        LocationId,
        ProductId,
        Batch,
        Quantity,
        Status,
        CreatedBy,
        ExecutedAt,
        CreatedAt,
        UpdatedAt,
    }
}
