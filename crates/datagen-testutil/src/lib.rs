use chrono::NaiveDate;
use datagen_core::schema::types::*;
use indexmap::IndexMap;

fn timeframe() -> Timeframe {
    Timeframe {
        start: NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        freq: None,
    }
}

fn sequence_column() -> Column {
    Column {
        ty: ColumnType::Int,
        nullable: false,
        null_probability: 0.0,
        generator: GeneratorSpec::Sequence { start: 1, step: 1 },
        modifiers: Vec::new(),
    }
}

/// A minimal two-node dataset: a `users` entity and an `events` fact table
/// fanning out from it with a uniform fanout. Used across core unit tests
/// that only need a valid parent/child pair.
pub fn two_table_dataset() -> Dataset {
    let mut users_columns = IndexMap::new();
    users_columns.insert("id".to_string(), sequence_column());

    let mut users = Node {
        kind: NodeKind::Entity,
        primary_key: "id".to_string(),
        rows: Some(20),
        parent: None,
        fanout: None,
        table_modifiers: Vec::new(),
        columns: users_columns,
    };
    users.rows = Some(20);

    let mut events_columns = IndexMap::new();
    events_columns.insert("id".to_string(), sequence_column());
    events_columns.insert(
        "user_id".to_string(),
        Column {
            ty: ColumnType::Int,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::Lookup {
                table: "users".to_string(),
                column: "id".to_string(),
                on: None,
            },
            modifiers: Vec::new(),
        },
    );

    let events = Node {
        kind: NodeKind::Fact,
        primary_key: "id".to_string(),
        rows: None,
        parent: Some("users".to_string()),
        fanout: Some(FanoutSpec::Uniform { min: 1, max: 3 }),
        table_modifiers: Vec::new(),
        columns: events_columns,
    };

    let mut nodes = IndexMap::new();
    nodes.insert("users".to_string(), users);
    nodes.insert("events".to_string(), events);

    Dataset {
        version: 1,
        metadata: Metadata {
            name: "two_table_test".to_string(),
        },
        timeframe: timeframe(),
        nodes,
        constraints: Constraints::default(),
        targets: Targets::default(),
    }
}

/// A single self-referential `employees` node: `manager_id` looks up other
/// rows of the same node. This is not a graph cycle — the executor
/// nullifies the first `k` rows in place (see the executor's self-reference
/// handling) rather than treating it as a cross-node dependency.
pub fn self_referential_dataset() -> Dataset {
    let mut columns = IndexMap::new();
    columns.insert("id".to_string(), sequence_column());
    columns.insert(
        "manager_id".to_string(),
        Column {
            ty: ColumnType::Int,
            nullable: true,
            null_probability: 0.1,
            generator: GeneratorSpec::Lookup {
                table: "employees".to_string(),
                column: "id".to_string(),
                on: None,
            },
            modifiers: Vec::new(),
        },
    );

    let employees = Node {
        kind: NodeKind::Entity,
        primary_key: "id".to_string(),
        rows: Some(50),
        parent: None,
        fanout: None,
        table_modifiers: Vec::new(),
        columns,
    };

    let mut nodes = IndexMap::new();
    nodes.insert("employees".to_string(), employees);

    Dataset {
        version: 1,
        metadata: Metadata {
            name: "self_referential_test".to_string(),
        },
        timeframe: timeframe(),
        nodes,
        constraints: Constraints::default(),
        targets: Targets::default(),
    }
}

/// A small ecommerce-flavored dataset (users / products / orders) that
/// exercises choice, distribution, faker, lookup, and modifier pipelines
/// together, for tests that need a more realistic shape than
/// [`two_table_dataset`].
pub fn ecommerce_dataset() -> Dataset {
    let mut users_columns = IndexMap::new();
    users_columns.insert("id".to_string(), sequence_column());
    users_columns.insert(
        "email".to_string(),
        Column {
            ty: ColumnType::String,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::Faker {
                method: "free_email".to_string(),
                locale_from: None,
            },
            modifiers: Vec::new(),
        },
    );

    let users = Node {
        kind: NodeKind::Entity,
        primary_key: "id".to_string(),
        rows: Some(100),
        parent: None,
        fanout: None,
        table_modifiers: Vec::new(),
        columns: users_columns,
    };

    let mut products_columns = IndexMap::new();
    products_columns.insert("id".to_string(), sequence_column());
    products_columns.insert(
        "price".to_string(),
        Column {
            ty: ColumnType::Float,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::Distribution {
                dist: DistributionKind::Lognormal {
                    mean: 3.0,
                    stddev: 0.5,
                },
                clamp: Some((1.0, 500.0)),
            },
            modifiers: Vec::new(),
        },
    );

    let products = Node {
        kind: NodeKind::Entity,
        primary_key: "id".to_string(),
        rows: Some(30),
        parent: None,
        fanout: None,
        table_modifiers: Vec::new(),
        columns: products_columns,
    };

    let mut orders_columns = IndexMap::new();
    orders_columns.insert("id".to_string(), sequence_column());
    orders_columns.insert(
        "user_id".to_string(),
        Column {
            ty: ColumnType::Int,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::Lookup {
                table: "users".to_string(),
                column: "id".to_string(),
                on: None,
            },
            modifiers: Vec::new(),
        },
    );
    orders_columns.insert(
        "product_id".to_string(),
        Column {
            ty: ColumnType::Int,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::Lookup {
                table: "products".to_string(),
                column: "id".to_string(),
                on: None,
            },
            modifiers: Vec::new(),
        },
    );

    let orders = Node {
        kind: NodeKind::Fact,
        primary_key: "id".to_string(),
        rows: None,
        parent: Some("users".to_string()),
        fanout: Some(FanoutSpec::Poisson {
            lambda: 2.0,
            min: 0,
            max: 10,
        }),
        table_modifiers: Vec::new(),
        columns: orders_columns,
    };

    let mut nodes = IndexMap::new();
    nodes.insert("users".to_string(), users);
    nodes.insert("products".to_string(), products);
    nodes.insert("orders".to_string(), orders);

    Dataset {
        version: 1,
        metadata: Metadata {
            name: "ecommerce_test".to_string(),
        },
        timeframe: timeframe(),
        nodes,
        constraints: Constraints::default(),
        targets: Targets::default(),
    }
}

/// A `user` entity, a `promotion` entity (each row an effect window with its
/// own multiplier), and an `impression` fact fanning out from `user` with a
/// table-level effect that scales fanout by matching promotions. Exercises
/// table-level effect scaling end to end.
pub fn promo_impression_dataset() -> Dataset {
    let mut users_columns = IndexMap::new();
    users_columns.insert("id".to_string(), sequence_column());

    let users = Node {
        kind: NodeKind::Entity,
        primary_key: "id".to_string(),
        rows: Some(50),
        parent: None,
        fanout: None,
        table_modifiers: Vec::new(),
        columns: users_columns,
    };

    // Five disjoint 30-day windows through the year, each with its own
    // multiplier, so a driver timestamp matches at most one promotion.
    let mut promo_columns = IndexMap::new();
    promo_columns.insert("id".to_string(), sequence_column());
    promo_columns.insert(
        "mult".to_string(),
        Column {
            ty: ColumnType::Float,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::EnumList {
                values: vec![1.5.into(), 2.0.into(), 1.5.into(), 2.0.into(), 1.5.into()],
            },
            modifiers: Vec::new(),
        },
    );
    promo_columns.insert(
        "start".to_string(),
        Column {
            ty: ColumnType::Timestamp,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::EnumList {
                values: vec![
                    "2024-01-01T00:00:00".into(),
                    "2024-03-01T00:00:00".into(),
                    "2024-05-01T00:00:00".into(),
                    "2024-07-01T00:00:00".into(),
                    "2024-09-01T00:00:00".into(),
                ],
            },
            modifiers: Vec::new(),
        },
    );
    promo_columns.insert(
        "end".to_string(),
        Column {
            ty: ColumnType::Timestamp,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::EnumList {
                values: vec![
                    "2024-01-30T00:00:00".into(),
                    "2024-03-30T00:00:00".into(),
                    "2024-05-30T00:00:00".into(),
                    "2024-07-30T00:00:00".into(),
                    "2024-09-30T00:00:00".into(),
                ],
            },
            modifiers: Vec::new(),
        },
    );

    let promotion = Node {
        kind: NodeKind::Entity,
        primary_key: "id".to_string(),
        rows: Some(5),
        parent: None,
        fanout: None,
        table_modifiers: Vec::new(),
        columns: promo_columns,
    };

    let mut impression_columns = IndexMap::new();
    impression_columns.insert("id".to_string(), sequence_column());
    impression_columns.insert(
        "user_id".to_string(),
        Column {
            ty: ColumnType::Int,
            nullable: false,
            null_probability: 0.0,
            generator: GeneratorSpec::Lookup {
                table: "users".to_string(),
                column: "id".to_string(),
                on: None,
            },
            modifiers: Vec::new(),
        },
    );

    let impression = Node {
        kind: NodeKind::Fact,
        primary_key: "id".to_string(),
        rows: None,
        parent: Some("users".to_string()),
        fanout: Some(FanoutSpec::Poisson {
            lambda: 2.0,
            min: 0,
            max: 20,
        }),
        table_modifiers: vec![ModifierSpec::Effect {
            event_table: "promotion".to_string(),
            on: IndexMap::new(),
            window: EffectWindow {
                start_col: "start".to_string(),
                end_col: "end".to_string(),
            },
            map: EffectMap {
                field: "mult".to_string(),
                op: EffectCombine::Mul,
                default: 1.0,
            },
        }],
        columns: impression_columns,
    };

    let mut nodes = IndexMap::new();
    nodes.insert("users".to_string(), users);
    nodes.insert("promotion".to_string(), promotion);
    nodes.insert("impression".to_string(), impression);

    Dataset {
        version: 1,
        metadata: Metadata {
            name: "promo_impression_test".to_string(),
        },
        timeframe: timeframe(),
        nodes,
        constraints: Constraints::default(),
        targets: Targets::default(),
    }
}
