use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_items_table::Migration),
            Box::new(m20240301_000002_create_recipes_tables::Migration),
            Box::new(m20240301_000003_create_warehouses_table::Migration),
            Box::new(m20240301_000004_create_stock_movements_table::Migration),
            Box::new(m20240301_000005_create_stock_balances_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(ColumnDef::new(Items::Category).string_len(32).not_null())
                        .col(ColumnDef::new(Items::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Name is deliberately NOT unique: legacy rows with duplicate
            // display names exist and the lookup path must surface them.
            manager
                .create_index(
                    Index::create()
                        .name("idx_items_name")
                        .table(Items::Table)
                        .col(Items::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
        Name,
        Category,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_recipes_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_recipes_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Recipes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Recipes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Recipes::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(Recipes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Recipes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_recipes_product_id")
                        .table(Recipes::Table)
                        .col(Recipes::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RecipeLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RecipeLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RecipeLines::RecipeId).uuid().not_null())
                        .col(ColumnDef::new(RecipeLines::IngredientId).uuid().not_null())
                        .col(
                            ColumnDef::new(RecipeLines::QuantityPerUnit)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(RecipeLines::Position).integer().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_recipe_lines_recipe_id")
                        .table(RecipeLines::Table)
                        .col(RecipeLines::RecipeId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RecipeLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Recipes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Recipes {
        Table,
        Id,
        ProductId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum RecipeLines {
        Table,
        Id,
        RecipeId,
        IngredientId,
        QuantityPerUnit,
        Position,
    }
}

mod m20240301_000003_create_warehouses_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_warehouses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(ColumnDef::new(Warehouses::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Warehouses::DefaultForCategory)
                                .string_len(32)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Warehouses {
        Table,
        Id,
        Name,
        Status,
        DefaultForCategory,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_stock_movements_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Seq)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Id).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::Delta)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ReferenceId).uuid().null())
                        .col(ColumnDef::new(StockMovements::Reverses).uuid().null())
                        .col(ColumnDef::new(StockMovements::Description).string().null())
                        .col(
                            ColumnDef::new(StockMovements::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_id")
                        .table(StockMovements::Table)
                        .col(StockMovements::Id)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_item_warehouse")
                        .table(StockMovements::Table)
                        .col(StockMovements::ItemId)
                        .col(StockMovements::WarehouseId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_reference_id")
                        .table(StockMovements::Table)
                        .col(StockMovements::ReferenceId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_recorded_at")
                        .table(StockMovements::Table)
                        .col(StockMovements::RecordedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Seq,
        Id,
        MovementType,
        ItemId,
        WarehouseId,
        Delta,
        ReferenceId,
        Reverses,
        Description,
        RecordedAt,
    }
}

mod m20240301_000005_create_stock_balances_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_stock_balances_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockBalances::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockBalances::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockBalances::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockBalances::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::LastMovementId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBalances::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .name("pk_stock_balances")
                                .col(StockBalances::ItemId)
                                .col(StockBalances::WarehouseId),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockBalances::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockBalances {
        Table,
        ItemId,
        WarehouseId,
        Quantity,
        LastMovementId,
        UpdatedAt,
    }
}
