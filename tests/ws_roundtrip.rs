mod common;

use anyhow::Result;
use common::{next_frame, TestRelay};
use silhouette_relay::protocol::{Event, EventKind, Face, MeshSnapshot, SilhouetteBitmap, Vec3};
use silhouette_relay::Producer;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn init_object_reaches_subscriber_byte_for_byte() -> Result<()> {
    let relay = TestRelay::start().await?;
    let mut client = relay.subscriber().await?;
    let producer = Producer::new(&relay.http_url())?;

    let mesh = MeshSnapshot::new(
        vec![
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
        ],
        vec![Face::new(0, 1, 2)],
    );
    producer.init_object(&mesh).await?;

    let mut expected = vec![EventKind::InitObject.tag(), 3, 0, 0, 0];
    for c in [0.0f32, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, -1.0, 0.0] {
        expected.extend_from_slice(&c.to_le_bytes());
    }
    expected.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);

    let frame = next_frame(&mut client).await?;
    assert_eq!(frame.as_bytes(), &expected[..]);
    assert_eq!(Event::from_frame(&frame)?, Event::InitObject(mesh));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn top_silhouette_round_trip() -> Result<()> {
    let relay = TestRelay::start().await?;
    let mut client = relay.subscriber().await?;
    let producer = Producer::new(&relay.http_url())?;

    producer
        .update_top_silhouette(&SilhouetteBitmap::new(2, 1, vec![10, 20]))
        .await?;

    let frame = next_frame(&mut client).await?;
    assert_eq!(
        frame.as_bytes(),
        &[0x04, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 10, 20]
    );

    match Event::from_frame(&frame)? {
        Event::UpdateTopSilhouette(bitmap) => {
            assert_eq!(bitmap.pixel_count(), 2);
            assert_eq!((bitmap.width, bitmap.height), (2, 1));
            assert_eq!(bitmap.intensity(0, 0), Some(10));
            assert_eq!(bitmap.intensity(1, 0), Some(20));
        }
        other => panic!("unexpected event {other:?}"),
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_messages_are_ignored() -> Result<()> {
    let relay = TestRelay::start().await?;
    let mut client = relay.subscriber().await?;
    let producer = Producer::new(&relay.http_url())?;

    client.send_text("hello relay").await?;
    producer
        .send_raw(EventKind::InitSilhouetteArea, vec![8, 0, 0, 0, 4, 0, 0, 0].into())
        .await?;

    let frame = next_frame(&mut client).await?;
    assert_eq!(frame.kind()?, EventKind::InitSilhouetteArea);
    assert_eq!(relay.relay.subscriber_count(), 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_silhouette_reaches_subscriber() -> Result<()> {
    let relay = TestRelay::start().await?;
    let mut client = relay.subscriber().await?;

    // 4200 x 4200 samples, past the usual 16 MiB WebSocket frame limit.
    let side = 4200;
    let pixels: Vec<u8> = (0..side * side).map(|i| (i % 251) as u8).collect();
    let bitmap = SilhouetteBitmap::new(side as i32, side as i32, pixels);
    let payload = bitmap.encode(EventKind::UpdateTopSilhouette)?;
    assert!(payload.len() > 16 * 1024 * 1024);

    let report = relay.relay.ingest(EventKind::UpdateTopSilhouette, &payload);
    assert_eq!(report.delivered, 1);

    let frame = next_frame(&mut client).await?;
    assert_eq!(frame.len(), payload.len() + 1);
    assert_eq!(frame.payload(), &payload[..]);
    assert_eq!(Event::from_frame(&frame)?, Event::UpdateTopSilhouette(bitmap));
    assert_eq!(relay.relay.subscriber_count(), 1);

    Ok(())
}
