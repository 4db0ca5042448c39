//! End-to-end scenarios for the log: writes, reads, rotation, batches,
//! checkpointing, and concurrent access.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use memlog::{Config, Error, Log, Offset, Record};
use tokio_util::sync::CancellationToken;

fn test_data(count: usize) -> Vec<Bytes> {
    (1..=count)
        .map(|id| {
            let event = serde_json::json!({
                "id": id.to_string(),
                "type": "record.created.event.v0",
                "source": "/api/v1/memlog_test",
            });
            Bytes::from(serde_json::to_vec(&event).unwrap())
        })
        .collect()
}

fn config(start: Offset, segment_size: usize) -> Config {
    Config {
        start_offset: start,
        segment_size,
        ..Config::default()
    }
}

async fn seed(log: &Log, cancel: &CancellationToken, data: &[Bytes]) {
    for payload in data {
        log.write(cancel, payload.clone()).await.unwrap();
    }
}

#[tokio::test]
async fn writes_and_reads_first_record() {
    let cancel = CancellationToken::new();
    let log = Log::new(Config::default()).unwrap();

    let offset = log
        .write(&cancel, Bytes::from("Hello World"))
        .await
        .unwrap();
    assert_eq!(offset, 0);

    let record = log.read(&cancel, 0).await.unwrap();
    assert_eq!(record.metadata.offset, 0);
    assert_eq!(record.data, Bytes::from("Hello World"));

    assert_eq!(log.range().await, (0, 0));
}

#[tokio::test]
async fn rotation_purges_oldest_records() {
    let cancel = CancellationToken::new();
    let log = Log::new(config(0, 10)).unwrap();
    let payloads = test_data(20);

    for (i, payload) in payloads.iter().enumerate() {
        let offset = log.write(&cancel, payload.clone()).await.unwrap();
        assert_eq!(offset, i as Offset);
    }

    assert_eq!(log.range().await, (10, 19));

    // purged
    assert_eq!(log.read(&cancel, 0).await, Err(Error::OutOfRange));

    // still retained
    let record = log.read(&cancel, 10).await.unwrap();
    assert_eq!(record.data, payloads[10]);
    let record = log.read(&cancel, 19).await.unwrap();
    assert_eq!(record.data, payloads[19]);

    // not written yet
    assert_eq!(log.read(&cancel, 20).await, Err(Error::FutureOffset));
}

#[tokio::test]
async fn non_zero_start_offset_shifts_addressing() {
    let cancel = CancellationToken::new();
    let log = Log::new(config(10, 10)).unwrap();
    let payloads = test_data(30);

    for (i, payload) in payloads.iter().enumerate() {
        let offset = log.write(&cancel, payload.clone()).await.unwrap();
        assert_eq!(offset, 10 + i as Offset);
    }

    assert_eq!(log.range().await, (30, 39));
    assert_eq!(log.read(&cancel, 29).await, Err(Error::OutOfRange));

    for offset in 30..40 {
        let record = log.read(&cancel, offset).await.unwrap();
        assert_eq!(record.metadata.offset, offset);
        assert_eq!(record.data, payloads[(offset - 10) as usize]);
    }
}

#[tokio::test]
async fn reads_batches_until_end_of_log() {
    let cancel = CancellationToken::new();
    let log = Log::new(config(0, 30)).unwrap();
    seed(&log, &cancel, &test_data(30)).await;

    let mut batch = vec![Record::default(); 10];

    for start in [0, 10, 20] {
        let (count, err) = log.read_batch(&cancel, start, &mut batch).await;
        assert_eq!(count, 10);
        assert_eq!(err, None);
        for (i, record) in batch.iter().enumerate() {
            assert_eq!(record.metadata.offset, start + i as Offset);
        }
    }

    let (count, err) = log.read_batch(&cancel, 30, &mut batch).await;
    assert_eq!(count, 0);
    assert_eq!(err, Some(Error::FutureOffset));
}

#[tokio::test]
async fn read_batch_fails_on_boundaries() {
    let cancel = CancellationToken::new();

    // empty log
    let log = Log::new(config(0, 10)).unwrap();
    let mut batch = vec![Record::default(); 10];
    let (count, err) = log.read_batch(&cancel, 0, &mut batch).await;
    assert_eq!((count, err), (0, Some(Error::FutureOffset)));

    // start offset below the log start
    let log = Log::new(config(10, 10)).unwrap();
    seed(&log, &cancel, &test_data(10)).await;
    let (count, err) = log.read_batch(&cancel, 0, &mut batch).await;
    assert_eq!((count, err), (0, Some(Error::OutOfRange)));

    // read offset past the tail
    let (count, err) = log.read_batch(&cancel, 20, &mut batch).await;
    assert_eq!((count, err), (0, Some(Error::FutureOffset)));
}

#[tokio::test]
async fn read_batch_returns_partial_prefix_at_tail() {
    let cancel = CancellationToken::new();
    let log = Log::new(config(0, 30)).unwrap();
    seed(&log, &cancel, &test_data(10)).await;

    let mut batch = vec![Record::default(); 10];
    let (count, err) = log.read_batch(&cancel, 5, &mut batch).await;

    assert_eq!(count, 5);
    assert_eq!(err, Some(Error::FutureOffset));
    for (i, record) in batch[..count].iter().enumerate() {
        assert_eq!(record.metadata.offset, 5 + i as Offset);
    }
}

#[tokio::test]
async fn read_batch_fails_when_cancelled() {
    let cancel = CancellationToken::new();
    let log = Log::new(Config::default()).unwrap();
    seed(&log, &cancel, &test_data(10)).await;

    cancel.cancel();
    let mut batch = vec![Record::default(); 10];
    let (count, err) = log.read_batch(&cancel, 0, &mut batch).await;

    assert_eq!((count, err), (0, Some(Error::Canceled)));
}

#[tokio::test]
async fn cancelled_operations_fail_without_side_effects() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let log = Log::new(Config::default()).unwrap();

    assert_eq!(
        log.write(&cancel, Bytes::from("data")).await,
        Err(Error::Canceled)
    );
    assert_eq!(log.read(&cancel, 0).await, Err(Error::Canceled));

    // nothing was written
    assert_eq!(log.range().await, (-1, -1));
}

#[tokio::test]
async fn records_are_immutable_across_reads() {
    let cancel = CancellationToken::new();
    let log = Log::new(Config::default()).unwrap();

    // the log keeps its own handle on the payload; the caller's buffer is
    // irrelevant after the write returns
    let mut source = b"original payload".to_vec();
    let offset = log
        .write(&cancel, Bytes::copy_from_slice(&source))
        .await
        .unwrap();
    source.iter_mut().for_each(|b| *b = 0);

    let first = log.read(&cancel, offset).await.unwrap();
    assert_eq!(first.data, Bytes::from("original payload"));

    // records handed out are independent of later reads
    drop(first);
    let second = log.read(&cancel, offset).await.unwrap();
    assert_eq!(second.data, Bytes::from("original payload"));
}

#[tokio::test]
async fn round_trips_every_retained_offset() {
    let cancel = CancellationToken::new();
    let log = Log::new(config(0, 10)).unwrap();
    let payloads = test_data(35);
    seed(&log, &cancel, &payloads).await;

    let (earliest, latest) = log.range().await;
    assert!(earliest <= latest);

    for offset in earliest..=latest {
        let record = log.read(&cancel, offset).await.unwrap();
        assert_eq!(record.metadata.offset, offset);
        assert_eq!(record.data, payloads[offset as usize]);
    }
}

#[tokio::test]
async fn checkpointed_reader_resumes_across_purges() {
    const SEG_SIZE: usize = 20;

    let cancel = CancellationToken::new();
    let source_data = test_data(50);
    let mut received: Vec<Record> = Vec::new();

    // first incarnation: write 20 records, reader checkpoints at offset 10
    let log = Log::new(config(0, SEG_SIZE)).unwrap();
    for (i, payload) in source_data[..20].iter().enumerate() {
        let offset = log.write(&cancel, payload.clone()).await.unwrap();
        assert_eq!(offset, i as Offset);
    }
    let mut checkpoint: Offset = 0;
    for i in 0..20 {
        let record = log.read(&cancel, i).await.unwrap();
        if record.metadata.offset == 10 {
            checkpoint = record.metadata.offset;
        }
        received.push(record);
    }

    // crash: a fresh log resumes from the checkpoint
    let log = Log::new(config(checkpoint, SEG_SIZE)).unwrap();
    for i in checkpoint..checkpoint + 20 {
        let offset = log
            .write(&cancel, source_data[i as usize].clone())
            .await
            .unwrap();
        assert_eq!(offset, i);
    }

    // reader catches up until it runs out of new data
    let mut next = checkpoint;
    loop {
        match log.read(&cancel, next).await {
            Ok(record) => {
                received.push(record);
                next += 1;
            }
            Err(err) => {
                assert_eq!(err, Error::FutureOffset);
                checkpoint = next - 1;
                break;
            }
        }
    }

    // more writes purge the checkpointed offset
    for payload in &source_data[checkpoint as usize..] {
        log.write(&cancel, payload.clone()).await.unwrap();
    }
    assert_eq!(log.read(&cancel, checkpoint).await, Err(Error::OutOfRange));

    // the reader consults the range and reads to the end
    let (earliest, latest) = log.range().await;
    for offset in earliest..=latest {
        received.push(log.read(&cancel, offset).await.unwrap());
    }

    // every source record was observed at least once
    let mut seen = HashSet::new();
    let mut deduped = Vec::new();
    for record in &received {
        let event: serde_json::Value = serde_json::from_slice(&record.data).unwrap();
        let id = event["id"].as_str().unwrap().to_string();
        if seen.insert(id) {
            deduped.push(record.clone());
        }
    }
    assert_eq!(deduped.len(), source_data.len());
    for (record, payload) in deduped.iter().zip(&source_data) {
        assert_eq!(&record.data, payload);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_observe_dense_offsets() {
    let cancel = CancellationToken::new();
    let log = Arc::new(Log::new(config(0, 100)).unwrap());
    let payloads = test_data(100);

    let mut handles = Vec::new();
    for payload in payloads {
        let log = Arc::clone(&log);
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            let offset = log.write(&cancel, payload).await.unwrap();

            // earliest/latest never report invalid offsets mid-run
            let (earliest, latest) = log.range().await;
            assert_ne!(earliest, -1);
            assert_ne!(latest, -1);

            offset
        }));
    }

    let mut offsets = HashSet::new();
    for handle in handles {
        assert!(offsets.insert(handle.await.unwrap()));
    }

    // all offsets assigned exactly once, densely
    assert_eq!(offsets.len(), 100);
    assert_eq!(log.range().await, (0, 99));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_with_purge_keep_retention_bound() {
    let cancel = CancellationToken::new();
    let log = Arc::new(Log::new(config(100, 10)).unwrap());

    let mut handles = Vec::new();
    for payload in test_data(50) {
        let log = Arc::clone(&log);
        let cancel = cancel.clone();
        handles.push(tokio::spawn(
            async move { log.write(&cancel, payload).await },
        ));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let (earliest, latest) = log.range().await;
    assert_eq!((earliest, latest), (130, 149));
    // at most two segments' worth of records remain readable
    assert!(latest - earliest + 1 <= 2 * 10);
}
