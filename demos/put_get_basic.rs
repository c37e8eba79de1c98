//! Single-process demo: one queue, a handful of puts and gets, printing
//! what each call observed. Run with `cargo run --example put_get_basic`
//! (after declaring it in Cargo.toml's `[[example]]` table).

use ringshm::{Queue, QueueError};

fn main() {
    let name = format!("/ringshm-demo-basic-{}", std::process::id());
    let _ = ringshm::segment::Segment::unlink(&name);

    let queue = Queue::create(&name, Some(8), Some(4)).expect("create queue");
    println!(
        "created {:?}: element_size={} maxsize={}",
        queue.name(),
        queue.element_size(),
        queue.maxsize()
    );

    for i in 0u64..4 {
        queue.put_nowait(&i.to_le_bytes()).expect("put_nowait");
        println!("put {i}, len now {}", queue.len());
    }

    match queue.put_nowait(&9u64.to_le_bytes()) {
        Err(QueueError::Full) => println!("fifth put correctly observed Full"),
        other => panic!("expected Full, got {other:?}"),
    }

    while !queue.is_empty() {
        let bytes = queue.get_nowait().expect("get_nowait");
        let value = u64::from_le_bytes(bytes.try_into().unwrap());
        println!("got {value}, len now {}", queue.len());
    }

    println!("final metrics: {}", queue.metrics());

    queue.close();
    let _ = ringshm::segment::Segment::unlink(&name);
}
