/// Example: resubmitting unprocessed batch entries with exponential backoff
///
/// Batch calls never retry on their own. The extended variants hand back what
/// the service declined so the caller decides how hard to try.
///
/// Run against LocalStack with `AWS_PROFILE=localstack`.
use dynamo_access::{CapacityUsed, DynamoItem, Error, ItemCodec, Key, Table};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    at: u64,
    celsius: f64,
}

impl DynamoItem for Reading {
    type PK = String;
    type SK = u64;

    const TABLE: &'static str = "readings";
    const PARTITION_KEY: &'static str = "sensor";
    const SORT_KEY: Option<&'static str> = Some("at");

    fn partition_key(&self) -> String {
        self.sensor.clone()
    }

    fn sort_key(&self) -> Option<u64> {
        Some(self.at)
    }
}

/// Write `items`, resubmitting whatever comes back unprocessed
async fn put_all(
    table: &Table<ItemCodec<Reading>>,
    items: Vec<Reading>,
    max_attempts: usize,
) -> Result<CapacityUsed, Error> {
    let mut pending = items;
    let mut capacity = CapacityUsed::new();
    let mut delay = Duration::from_millis(100);

    for attempt in 1..=max_attempts {
        println!("Attempt {attempt}: writing {} items", pending.len());

        let result = table.put_batch_extended_async(&pending).await?;
        capacity.merge(&result.capacity);

        if result.is_complete() {
            return Ok(capacity);
        }

        println!("{} items were not processed", result.unprocessed.len());
        pending = result.unprocessed;

        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }

    eprintln!("{} items still unprocessed after {max_attempts} attempts", pending.len());
    Ok(capacity)
}

/// Delete by key, resubmitting the keys that come back unprocessed
async fn delete_all(
    table: &Table<ItemCodec<Reading>>,
    keys: Vec<Key<String, u64>>,
    max_attempts: usize,
) -> Result<(), Error> {
    let mut pending = keys;
    let mut delay = Duration::from_millis(100);

    for _ in 0..max_attempts {
        let result = table.delete_batch_by_key_extended_async(&pending).await?;
        if result.is_complete() {
            return Ok(());
        }
        pending = result.unprocessed;
        tokio::time::sleep(delay).await;
        delay *= 2;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let table = Reading::table_builder().default_client().await.build()?;

    let readings: Vec<Reading> = (0..60)
        .map(|at| Reading {
            sensor: "greenhouse-1".to_string(),
            at,
            celsius: 18.0 + (at % 7) as f64,
        })
        .collect();

    let capacity = put_all(&table, readings.clone(), 5).await?;
    println!("Consumed {} write units", capacity.total_write);

    let mut latest = table
        .query("greenhouse-1".to_string())
        .scan_forward(false)
        .limit(5)
        .invoke()?;
    while let Some(reading) = latest.try_next().await? {
        println!("{} -> {:.1}", reading.at, reading.celsius);
    }

    let keys = readings.iter().map(|reading| table.key_of(reading)).collect();
    delete_all(&table, keys, 5).await
}
