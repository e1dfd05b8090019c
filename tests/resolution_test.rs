//! Warehouse-resolution policy and sale expansion behavior.

mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tavola_stock::{
    entities::{item::ItemCategory, item::ItemStatus, warehouse::WarehouseStatus},
    errors::ServiceError,
    services::stock::BalanceView,
};
use uuid::Uuid;

#[tokio::test]
async fn sale_deducts_from_the_only_positive_warehouse() {
    // Scenario A: flour lives only in the ingredients warehouse.
    let db = common::connect().await;
    let (ingredients_wh, goods_wh) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    let bread = common::seed_item(&db, "bread", ItemCategory::Product).await;
    common::seed_recipe(&db, bread.id, &[(flour.id, dec!(3))]).await;

    state
        .services
        .stock
        .record_receipt(flour.id, ingredients_wh.id, dec!(10), None, None)
        .await
        .expect("receipt");

    let movement_ids = state
        .services
        .stock
        .process_sale(bread.id, Decimal::ONE, Uuid::new_v4())
        .await
        .expect("sale");
    assert_eq!(movement_ids.len(), 1);

    let balance = state
        .services
        .balances
        .get(flour.id, ingredients_wh.id)
        .await
        .expect("balance");
    assert_eq!(balance, dec!(7));

    let untouched = state
        .services
        .balances
        .get(flour.id, goods_wh.id)
        .await
        .expect("balance");
    assert_eq!(untouched, Decimal::ZERO);
}

#[tokio::test]
async fn tie_break_prefers_the_category_default() {
    // Scenario B: equal stock in two warehouses; the category default wins.
    let db = common::connect().await;
    let (wh_a, _goods) = common::seed_default_warehouses(&db).await;
    let wh_b =
        common::seed_warehouse(&db, "Backroom", WarehouseStatus::Active, None).await;
    let state = common::build_state(db.clone()).await;

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    state
        .services
        .stock
        .record_receipt(flour.id, wh_a.id, dec!(5), None, None)
        .await
        .expect("receipt a");
    state
        .services
        .stock
        .record_receipt(flour.id, wh_b.id, dec!(5), None, None)
        .await
        .expect("receipt b");

    state
        .services
        .stock
        .process_sale(flour.id, dec!(2), Uuid::new_v4())
        .await
        .expect("sale");

    assert_eq!(
        state
            .services
            .balances
            .get(flour.id, wh_a.id)
            .await
            .expect("balance a"),
        dec!(3)
    );
    assert_eq!(
        state
            .services
            .balances
            .get(flour.id, wh_b.id)
            .await
            .expect("balance b"),
        dec!(5)
    );
}

#[tokio::test]
async fn tie_break_falls_back_to_largest_quantity_then_smallest_id() {
    let db = common::connect().await;
    let (_ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let wh_b = common::seed_warehouse(&db, "Backroom", WarehouseStatus::Active, None).await;
    let wh_c = common::seed_warehouse(&db, "Cellar", WarehouseStatus::Active, None).await;
    let state = common::build_state(db.clone()).await;

    let basil = common::seed_item(&db, "basil", ItemCategory::Ingredient).await;
    state
        .services
        .stock
        .record_receipt(basil.id, wh_b.id, dec!(5), None, None)
        .await
        .expect("receipt b");
    state
        .services
        .stock
        .record_receipt(basil.id, wh_c.id, dec!(9), None, None)
        .await
        .expect("receipt c");

    // Neither candidate is the default (the default holds nothing), so the
    // larger quantity wins.
    let resolved = state
        .services
        .stock
        .resolve_warehouse_for_consumption(&basil)
        .await
        .expect("resolve");
    assert_eq!(resolved, wh_c.id);

    // Level the quantities; the smaller warehouse id breaks the tie.
    state
        .services
        .stock
        .record_receipt(basil.id, wh_b.id, dec!(4), None, None)
        .await
        .expect("top up b");
    let resolved = state
        .services
        .stock
        .resolve_warehouse_for_consumption(&basil)
        .await
        .expect("resolve");
    assert_eq!(resolved, std::cmp::min(wh_b.id, wh_c.id));
}

#[tokio::test]
async fn resolution_is_deterministic_for_a_fixed_snapshot() {
    let db = common::connect().await;
    let (_ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let wh_b = common::seed_warehouse(&db, "Backroom", WarehouseStatus::Active, None).await;
    let wh_c = common::seed_warehouse(&db, "Cellar", WarehouseStatus::Active, None).await;
    let state = common::build_state(db.clone()).await;

    let salt = common::seed_item(&db, "salt", ItemCategory::Ingredient).await;
    for wh in [wh_b.id, wh_c.id] {
        state
            .services
            .stock
            .record_receipt(salt.id, wh, dec!(6), None, None)
            .await
            .expect("receipt");
    }

    let first = state
        .services
        .stock
        .resolve_warehouse_for_consumption(&salt)
        .await
        .expect("resolve");
    for _ in 0..5 {
        let next = state
            .services
            .stock
            .resolve_warehouse_for_consumption(&salt)
            .await
            .expect("resolve");
        assert_eq!(next, first);
    }
}

#[tokio::test]
async fn consumption_without_stock_hits_the_category_default_and_may_go_negative() {
    // Scenario C: no positive balance anywhere; the sale still goes through.
    let db = common::connect().await;
    let (ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    let sugar = common::seed_item(&db, "sugar", ItemCategory::Ingredient).await;
    let cake = common::seed_item(&db, "cake", ItemCategory::Product).await;
    common::seed_recipe(&db, cake.id, &[(sugar.id, dec!(4))]).await;

    state
        .services
        .stock
        .process_sale(cake.id, Decimal::ONE, Uuid::new_v4())
        .await
        .expect("sale");

    let balance = state
        .services
        .balances
        .get(sugar.id, ingredients_wh.id)
        .await
        .expect("balance");
    assert_eq!(balance, dec!(-4));
}

#[tokio::test]
async fn incomplete_recipe_appends_nothing() {
    let db = common::connect().await;
    let (ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    let pie = common::seed_item(&db, "pie", ItemCategory::Product).await;
    // Second line points at an ingredient that does not exist.
    common::seed_recipe(&db, pie.id, &[(flour.id, dec!(2)), (Uuid::new_v4(), dec!(1))]).await;

    state
        .services
        .stock
        .record_receipt(flour.id, ingredients_wh.id, dec!(10), None, None)
        .await
        .expect("receipt");

    let reference_id = Uuid::new_v4();
    let err = state
        .services
        .stock
        .process_sale(pie.id, Decimal::ONE, reference_id)
        .await
        .expect_err("expansion must fail closed");
    assert_matches!(err, ServiceError::IncompleteRecipe(_));

    let movements = state
        .services
        .movements
        .list_by_reference(reference_id)
        .await
        .expect("list by reference");
    assert!(movements.is_empty());

    // The valid first line was not deducted either.
    assert_eq!(
        state
            .services
            .balances
            .get(flour.id, ingredients_wh.id)
            .await
            .expect("balance"),
        dec!(10)
    );
}

#[tokio::test]
async fn product_without_recipe_consumes_itself() {
    let db = common::connect().await;
    let (_ingredients_wh, goods_wh) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    let cola = common::seed_item(&db, "cola", ItemCategory::Product).await;
    state
        .services
        .stock
        .record_receipt(cola.id, goods_wh.id, dec!(6), None, None)
        .await
        .expect("receipt");

    state
        .services
        .stock
        .process_sale(cola.id, dec!(2), Uuid::new_v4())
        .await
        .expect("sale");

    assert_eq!(
        state
            .services
            .balances
            .get(cola.id, goods_wh.id)
            .await
            .expect("balance"),
        dec!(4)
    );
}

#[tokio::test]
async fn multi_ingredient_sale_resolves_each_ingredient_independently() {
    let db = common::connect().await;
    let (ingredients_wh, goods_wh) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    let bottle = common::seed_item(&db, "bottle", ItemCategory::Product).await;
    let combo = common::seed_item(&db, "combo", ItemCategory::Product).await;
    common::seed_recipe(&db, combo.id, &[(flour.id, dec!(2)), (bottle.id, dec!(1))]).await;

    state
        .services
        .stock
        .record_receipt(flour.id, ingredients_wh.id, dec!(8), None, None)
        .await
        .expect("receipt flour");
    state
        .services
        .stock
        .record_receipt(bottle.id, goods_wh.id, dec!(3), None, None)
        .await
        .expect("receipt bottle");

    let movement_ids = state
        .services
        .stock
        .process_sale(combo.id, Decimal::ONE, Uuid::new_v4())
        .await
        .expect("sale");
    assert_eq!(movement_ids.len(), 2);

    assert_eq!(
        state
            .services
            .balances
            .get(flour.id, ingredients_wh.id)
            .await
            .expect("flour balance"),
        dec!(6)
    );
    assert_eq!(
        state
            .services
            .balances
            .get(bottle.id, goods_wh.id)
            .await
            .expect("bottle balance"),
        dec!(2)
    );
}

#[tokio::test]
async fn inactive_warehouses_never_win_resolution() {
    let db = common::connect().await;
    let (ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let cellar = common::seed_warehouse(&db, "Cellar", WarehouseStatus::Active, None).await;
    let state = common::build_state(db.clone()).await;

    let rice = common::seed_item(&db, "rice", ItemCategory::Ingredient).await;
    state
        .services
        .stock
        .record_receipt(rice.id, cellar.id, dec!(20), None, None)
        .await
        .expect("receipt");

    // Deactivate the only stocked warehouse, then rebuild the registry
    // snapshot the way a restart would.
    common::deactivate_warehouse(&db, cellar).await;
    let state = common::build_state(db.clone()).await;

    let resolved = state
        .services
        .stock
        .resolve_warehouse_for_consumption(&rice)
        .await
        .expect("resolve");
    assert_eq!(resolved, ingredients_wh.id);
}

#[tokio::test]
async fn name_lookup_surfaces_duplicates() {
    let db = common::connect().await;
    let (_ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    common::seed_item(&db, "tomato", ItemCategory::Ingredient).await;
    common::seed_item(&db, "tomato", ItemCategory::Ingredient).await;
    // Archived duplicates do not count as live.
    common::seed_item_with_status(&db, "basil", ItemCategory::Ingredient, ItemStatus::Archived)
        .await;
    let live_basil = common::seed_item(&db, "basil", ItemCategory::Ingredient).await;

    let err = state
        .services
        .catalog
        .find_item_by_name("tomato")
        .await
        .expect_err("duplicate names are ambiguous");
    assert_matches!(err, ServiceError::AmbiguousName(_));

    let found = state
        .services
        .catalog
        .find_item_by_name("basil")
        .await
        .expect("single live match");
    assert_eq!(found.id, live_basil.id);

    let err = state
        .services
        .catalog
        .find_item_by_name("saffron")
        .await
        .expect_err("unknown name");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn sale_input_validation() {
    let db = common::connect().await;
    let (_ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    let err = state
        .services
        .stock
        .process_sale(Uuid::new_v4(), Decimal::ONE, Uuid::new_v4())
        .await
        .expect_err("unknown item");
    assert_matches!(err, ServiceError::NotFound(_));

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    let err = state
        .services
        .stock
        .process_sale(flour.id, Decimal::ZERO, Uuid::new_v4())
        .await
        .expect_err("non-positive quantity");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn transfer_moves_stock_between_warehouses() {
    let db = common::connect().await;
    let (ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let backroom = common::seed_warehouse(&db, "Backroom", WarehouseStatus::Active, None).await;
    let state = common::build_state(db.clone()).await;

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    state
        .services
        .stock
        .record_receipt(flour.id, ingredients_wh.id, dec!(10), None, None)
        .await
        .expect("receipt");

    let movement_ids = state
        .services
        .stock
        .record_transfer(flour.id, ingredients_wh.id, backroom.id, dec!(4), None)
        .await
        .expect("transfer");
    assert_eq!(movement_ids.len(), 2);

    assert_eq!(
        state
            .services
            .balances
            .get(flour.id, ingredients_wh.id)
            .await
            .expect("source balance"),
        dec!(6)
    );
    assert_eq!(
        state
            .services
            .balances
            .get(flour.id, backroom.id)
            .await
            .expect("destination balance"),
        dec!(4)
    );

    let err = state
        .services
        .stock
        .record_transfer(flour.id, backroom.id, backroom.id, Decimal::ONE, None)
        .await
        .expect_err("same-warehouse transfer");
    assert_matches!(err, ServiceError::InvalidOperation(_));

    // The destination's log carries exactly the inbound transfer leg.
    let log = state
        .services
        .movements
        .list_by_warehouse(backroom.id, &tavola_stock::services::movements::TimeRange::all())
        .await
        .expect("warehouse log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].delta, dec!(4));
    assert!(log.windows(2).all(|pair| pair[0].seq < pair[1].seq));
}

#[tokio::test]
async fn inventory_count_appends_only_the_difference() {
    let db = common::connect().await;
    let (ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    state
        .services
        .stock
        .record_receipt(flour.id, ingredients_wh.id, dec!(10), None, None)
        .await
        .expect("receipt");

    let movement = state
        .services
        .stock
        .record_inventory_count(flour.id, ingredients_wh.id, dec!(7), None)
        .await
        .expect("count");
    assert!(movement.is_some());
    assert_eq!(
        state
            .services
            .balances
            .get(flour.id, ingredients_wh.id)
            .await
            .expect("balance"),
        dec!(7)
    );

    // A count matching the stored quantity appends nothing.
    let movement = state
        .services
        .stock
        .record_inventory_count(flour.id, ingredients_wh.id, dec!(7), None)
        .await
        .expect("no-op count");
    assert!(movement.is_none());
}

#[tokio::test]
async fn reversal_compensates_without_touching_the_original() {
    let db = common::connect().await;
    let (ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let state = common::build_state(db.clone()).await;

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    state
        .services
        .stock
        .record_receipt(flour.id, ingredients_wh.id, dec!(10), None, None)
        .await
        .expect("receipt");

    let sale_movements = state
        .services
        .stock
        .process_sale(flour.id, dec!(3), Uuid::new_v4())
        .await
        .expect("sale");
    let sale_movement_id = sale_movements[0];

    let reversal_id = state
        .services
        .stock
        .reverse_movement(sale_movement_id, Some("void receipt line".to_string()))
        .await
        .expect("reverse");

    assert_eq!(
        state
            .services
            .balances
            .get(flour.id, ingredients_wh.id)
            .await
            .expect("balance"),
        dec!(10)
    );

    let reversal = state
        .services
        .movements
        .get(reversal_id)
        .await
        .expect("reversal row");
    assert_eq!(reversal.reverses, Some(sale_movement_id));
    assert_eq!(reversal.delta, dec!(3));

    let original = state
        .services
        .movements
        .get(sale_movement_id)
        .await
        .expect("original row");
    assert_eq!(original.delta, dec!(-3));
}

#[tokio::test]
async fn balance_view_covers_single_and_per_warehouse_queries() {
    let db = common::connect().await;
    let (ingredients_wh, _goods) = common::seed_default_warehouses(&db).await;
    let backroom = common::seed_warehouse(&db, "Backroom", WarehouseStatus::Active, None).await;
    let state = common::build_state(db.clone()).await;

    let flour = common::seed_item(&db, "flour", ItemCategory::Ingredient).await;
    state
        .services
        .stock
        .record_receipt(flour.id, ingredients_wh.id, dec!(9), None, None)
        .await
        .expect("receipt");
    state
        .services
        .stock
        .record_receipt(flour.id, backroom.id, dec!(2), None, None)
        .await
        .expect("receipt");

    match state
        .services
        .stock
        .get_balance(flour.id, Some(ingredients_wh.id))
        .await
        .expect("single view")
    {
        BalanceView::Single(quantity) => assert_eq!(quantity, dec!(9)),
        other => panic!("expected single view, got {:?}", other),
    }

    match state
        .services
        .stock
        .get_balance(flour.id, None)
        .await
        .expect("map view")
    {
        BalanceView::PerWarehouse(map) => {
            assert_eq!(map.len(), 2);
            assert_eq!(map.get(&ingredients_wh.id), Some(&dec!(9)));
            assert_eq!(map.get(&backroom.id), Some(&dec!(2)));
        }
        other => panic!("expected per-warehouse view, got {:?}", other),
    }
}
