/// Common test fixtures and data structures
///
/// Defines the item types the integration tests store, each declared through
/// `DynamoItem` (and `GsiItem`) the way an application would.
use super::{Deserialize, DynamoItem, Serialize};
use dynamo_access::GsiItem;

/// Simple test object with partition and sort key
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TestObject {
    pub game: String,
    pub age: u32,
    pub ux: String,
    pub number2: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[allow(dead_code)]
impl TestObject {
    pub fn new(game: &str, age: u32) -> Self {
        Self {
            game: game.to_string(),
            age,
            ux: format!("ux-{age}"),
            number2: age as usize * 2,
            note: None,
        }
    }
}

impl DynamoItem for TestObject {
    type PK = String;
    type SK = u32;
    const TABLE: &'static str = "tests_generic_objects";
    const PARTITION_KEY: &'static str = "game";
    const SORT_KEY: Option<&'static str> = Some("age");

    fn partition_key(&self) -> String {
        self.game.to_string()
    }

    fn sort_key(&self) -> Option<u32> {
        Some(self.age)
    }
}

/// Partition-only test object
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TestCounters {
    pub imo: String,
    pub det: String,
    pub p1: usize,
    pub p2: usize,
}

impl DynamoItem for TestCounters {
    type PK = String;
    type SK = String;
    const TABLE: &'static str = "tests_generic_counters";
    const PARTITION_KEY: &'static str = "imo";

    fn partition_key(&self) -> String {
        self.imo.to_string()
    }
}

/// Test object whose sort key type admits null
#[allow(dead_code)]
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TestSlotted {
    pub game: String,
    pub slot: Option<u32>,
}

impl DynamoItem for TestSlotted {
    type PK = String;
    type SK = Option<u32>;
    const TABLE: &'static str = "tests_slotted_objects";
    const PARTITION_KEY: &'static str = "game";
    const SORT_KEY: Option<&'static str> = Some("slot");

    fn partition_key(&self) -> String {
        self.game.clone()
    }

    fn sort_key(&self) -> Option<Option<u32>> {
        Some(self.slot)
    }
}

/// Test object with a global secondary index on `user_id` / `age`
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TestGSIObject {
    pub game: String,
    pub age: u32,
    pub user_id: String,
    pub created_at: String,
    pub ux: String,
}

#[allow(dead_code)]
impl TestGSIObject {
    pub fn new(game: &str, age: u32, user_id: &str) -> Self {
        Self {
            game: game.to_string(),
            age,
            user_id: user_id.to_string(),
            created_at: format!("2024-01-{:02}", age % 28 + 1),
            ux: format!("{game}/{user_id}"),
        }
    }
}

impl DynamoItem for TestGSIObject {
    type PK = String;
    type SK = u32;
    const TABLE: &'static str = "tests_gsi_objects";
    const PARTITION_KEY: &'static str = "game";
    const SORT_KEY: Option<&'static str> = Some("age");

    fn partition_key(&self) -> String {
        self.game.to_string()
    }

    fn sort_key(&self) -> Option<u32> {
        Some(self.age)
    }
}

impl GsiItem for TestGSIObject {
    type GsiPK = String;
    type GsiSK = u32;
    const GSI_PARTITION_KEY: &'static str = "user_id";
    const GSI_SORT_KEY: Option<&'static str> = Some("age");

    fn gsi_partition_key(&self) -> String {
        self.user_id.clone()
    }

    fn gsi_sort_key(&self) -> Option<u32> {
        Some(self.age)
    }
}

/// Name the fixture service registers the `TestGSIObject` index under
pub fn gsi_index_name() -> String {
    TestGSIObject::global_index_name()
}
