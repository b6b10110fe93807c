//! # Bus Flows
//!
//! Push → lane → consumer through a [`Bus`] opened from the process-wide
//! registry with the shared memory driver.
//!
//! The shared driver keeps one lane per topic name for the whole test
//! binary, so every test here uses topic names no other test uses.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use bus_driver::{BusError, Message, PayloadType, Topic, TopicDescriptor};
    use event_bus::{Bus, MovieReleaseMessage, MOVIE_RELEASE};
    use serde::{Deserialize, Serialize};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use crate::integration::{register_drivers, wait_subscribed};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Review {
        movie_id: i64,
        stars: u8,
    }

    static REVIEW_POSTED: TopicDescriptor<Review> = TopicDescriptor::new("review.post.*", "review");
    static REVIEW_EDITED: TopicDescriptor<Review> = TopicDescriptor::new("review.edit.*", "review");

    async fn open_memory() -> Bus {
        register_drivers();
        Bus::open("memory").await.expect("memory driver opens")
    }

    /// Start `bus.subscribe()` on its own task and wait until it is live.
    async fn start(bus: Bus) -> (Arc<Bus>, JoinHandle<Result<(), BusError>>) {
        let bus = Arc::new(bus);
        let handle = tokio::spawn({
            let bus = Arc::clone(&bus);
            async move { bus.subscribe().await }
        });
        wait_subscribed(&bus).await;
        (bus, handle)
    }

    async fn stop(bus: &Bus, handle: JoinHandle<Result<(), BusError>>) {
        assert!(bus.cancel_subscription());
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("subscription should stop after cancel")
            .expect("subscription task should not panic")
            .expect("cancelled subscription returns Ok");
    }

    fn counting_topic(name: &str, calls: &Arc<AtomicUsize>) -> Topic {
        let calls = Arc::clone(calls);
        Topic::new(name, "flows", PayloadType::raw()).with_raw_consumer(move |_message| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        })
    }

    async fn wait_for(calls: &AtomicUsize, expected: usize) {
        timeout(Duration::from_secs(1), async {
            while calls.load(Ordering::SeqCst) < expected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("consumer should be called within timeout");
    }

    // =============================================================================
    // TYPED FLOWS
    // =============================================================================

    #[tokio::test]
    async fn test_movie_release_round_trip() {
        let mut bus = open_memory().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.register_movie_release_consumer(move |movie: MovieReleaseMessage| {
            let tx = tx.clone();
            async move {
                tx.send(movie)?;
                anyhow::Ok(())
            }
        })
        .unwrap();
        let (bus, handle) = start(bus).await;

        let released = MovieReleaseMessage {
            id: 1,
            title: "Alien".to_string(),
            genre: "Horror|Sci-Fi".to_string(),
            revenue: "$78900000.00".to_string(),
            rating: 5,
        };
        bus.push_payload(&MOVIE_RELEASE, "*", released.clone())
            .await
            .unwrap();

        let received = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("should receive within timeout")
            .expect("channel open");
        assert_eq!(received, released);

        stop(&bus, handle).await;
    }

    #[tokio::test]
    async fn test_typed_review_round_trip() {
        let mut bus = open_memory().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.register_consumer(REVIEW_POSTED.with_consumer(move |review: Review| {
            let tx = tx.clone();
            async move {
                tx.send(review)?;
                anyhow::Ok(())
            }
        }))
        .unwrap();
        let (bus, handle) = start(bus).await;

        bus.push_payload(&REVIEW_POSTED, "*", Review { movie_id: 3, stars: 4 })
            .await
            .unwrap();

        let received = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("should receive within timeout")
            .expect("channel open");
        assert_eq!(received, Review { movie_id: 3, stars: 4 });

        stop(&bus, handle).await;
    }

    #[tokio::test]
    async fn test_mismatched_payload_is_returned_to_publisher() {
        let mut bus = open_memory().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.register_consumer(REVIEW_EDITED.with_consumer(move |review: Review| {
            let tx = tx.clone();
            async move {
                tx.send(review)?;
                anyhow::Ok(())
            }
        }))
        .unwrap();
        let (bus, handle) = start(bus).await;

        let topic = REVIEW_EDITED.topic();
        let err = bus
            .push(&topic, "*", Message::typed(42_u32))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::PayloadMismatch { .. }));

        let err = bus
            .push(&topic, "*", Message::raw(b"not json".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::PayloadMismatch { .. }));

        bus.push_payload(&REVIEW_EDITED, "*", Review { movie_id: 8, stars: 1 })
            .await
            .unwrap();

        let received = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("valid message should still arrive")
            .expect("channel open");
        assert_eq!(received, Review { movie_id: 8, stars: 1 });
        assert!(rx.try_recv().is_err());

        stop(&bus, handle).await;
    }

    // =============================================================================
    // ROUTING ACROSS TOPICS
    // =============================================================================

    #[tokio::test]
    async fn test_topics_receive_only_their_own_messages() {
        let mut bus = open_memory().await;
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        bus.register_consumer(counting_topic("alpha.one.*", &first))
            .unwrap();
        bus.register_consumer(counting_topic("alpha.two.*", &second))
            .unwrap();
        let (bus, handle) = start(bus).await;

        let one = bus.topics()[0].clone();
        for _ in 0..3 {
            bus.push(&one, "*", Message::raw(b"{}".to_vec())).await.unwrap();
        }
        wait_for(&first, 3).await;

        assert_eq!(second.load(Ordering::SeqCst), 0);
        stop(&bus, handle).await;
    }

    #[tokio::test]
    async fn test_second_handle_competes_for_same_topic() {
        let calls = Arc::new(AtomicUsize::new(0));

        let mut consumer_bus = open_memory().await;
        consumer_bus
            .register_consumer(counting_topic("beta.shared.*", &calls))
            .unwrap();
        let (consumer_bus, handle) = start(consumer_bus).await;

        // A separate handle pushes; the shared lane table connects them.
        let publisher = open_memory().await;
        let topic = Topic::new("beta.shared.*", "flows", PayloadType::raw());
        publisher
            .push(&topic, "tenant-a", Message::raw(b"{}".to_vec()))
            .await
            .unwrap();

        wait_for(&calls, 1).await;
        stop(&consumer_bus, handle).await;
    }

    // =============================================================================
    // SUBSCRIPTION STATE
    // =============================================================================

    #[tokio::test]
    async fn test_subscribe_without_consumers() {
        let bus = open_memory().await;
        assert!(matches!(bus.subscribe().await, Err(BusError::NoConsumers)));
    }

    #[tokio::test]
    async fn test_second_subscribe_is_rejected_then_allowed_after_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut bus = open_memory().await;
        bus.register_consumer(counting_topic("delta.state.*", &calls))
            .unwrap();
        let (bus, handle) = start(bus).await;

        assert!(matches!(
            bus.subscribe().await,
            Err(BusError::AlreadySubscribed)
        ));

        stop(&bus, handle).await;
        assert!(!bus.is_subscribed());

        let again = tokio::spawn({
            let bus = Arc::clone(&bus);
            async move { bus.subscribe().await }
        });
        wait_subscribed(&bus).await;
        stop(&bus, again).await;
    }

    // =============================================================================
    // TELEMETRY
    // =============================================================================

    #[tokio::test]
    async fn test_memory_traffic_is_counted() {
        bus_telemetry::register_metrics().unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let mut bus = open_memory().await;
        bus.register_consumer(counting_topic("epsilon.count.*", &calls))
            .unwrap();
        let (bus, handle) = start(bus).await;

        let topic = bus.topics()[0].clone();
        bus.push(&topic, "*", Message::raw(b"{}".to_vec())).await.unwrap();
        wait_for(&calls, 1).await;
        stop(&bus, handle).await;

        let text = bus_telemetry::gather_metrics().unwrap();
        assert!(text.contains("bus_messages_published_total"));
        assert!(text.contains("epsilon.count.*"));
        assert!(text.contains("bus_messages_consumed_total"));
    }
}
