//! Two-thread demo standing in for a two-process producer/consumer: one
//! thread blocks on `put`, the other blocks on `get`, both against the
//! same named segment. A real two-process setup would instead run this
//! split across two binaries that each call `Queue::open` by name.

use std::thread;
use std::time::Duration;

use ringshm::Queue;

const MESSAGES: u64 = 20_000;

fn main() {
    let name = format!("/ringshm-demo-producer-consumer-{}", std::process::id());
    let _ = ringshm::segment::Segment::unlink(&name);

    let producer_queue = Queue::create(&name, Some(8), Some(1024)).expect("create queue");

    let consumer = thread::spawn({
        let name = name.clone();
        move || {
            let queue = Queue::open(&name).expect("open queue");
            let mut sum = 0u64;
            let mut received = 0u64;
            while received < MESSAGES {
                let bytes = queue.get(Some(Duration::from_secs(5))).expect("get");
                sum += u64::from_le_bytes(bytes.try_into().unwrap());
                received += 1;
            }
            (received, sum)
        }
    });

    for i in 0..MESSAGES {
        producer_queue.put(&i.to_le_bytes(), None).expect("put");
    }

    let (received, sum) = consumer.join().expect("consumer thread");
    let expected_sum: u64 = (0..MESSAGES).sum();
    println!("received {received} messages, sum={sum} (expected {expected_sum})");
    assert_eq!(received, MESSAGES);
    assert_eq!(sum, expected_sum);

    producer_queue.close();
    let _ = ringshm::segment::Segment::unlink(&name);
}
