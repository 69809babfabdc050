use gifplay::*;
use rgb::RGBA8;
use std::borrow::Cow;
use std::time::{Duration, Instant};

const PALETTE: [u8; 9] = [255, 0, 0, 0, 255, 0, 0, 0, 255];
const RED: RGBA8 = RGBA8::new(255, 0, 0, 255);
const GREEN: RGBA8 = RGBA8::new(0, 255, 0, 255);
const BLUE: RGBA8 = RGBA8::new(0, 0, 255, 255);

/// 2x1 GIF, one frame per delay. Frame `n` has palette entry `n % 3` on the left and `n + 1` on the right.
fn make_gif(delays_cs: &[u16], repeat: Option<gif::Repeat>) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = gif::Encoder::new(&mut out, 2, 1, &PALETTE).unwrap();
        if let Some(repeat) = repeat {
            enc.set_repeat(repeat).unwrap();
        }
        for (n, &delay) in delays_cs.iter().enumerate() {
            let n = n as u8;
            enc.write_frame(&gif::Frame {
                width: 2,
                height: 1,
                delay,
                buffer: Cow::Owned(vec![n % 3, (n + 1) % 3]),
                ..gif::Frame::default()
            }).unwrap();
        }
    }
    out
}

fn delays(doc: &GifDocument) -> Vec<f64> {
    doc.frames().iter().map(|f| f.delay()).collect()
}

#[test]
fn three_frames_play_once() {
    let doc = GifDocument::decode(&make_gif(&[10, 20, 30], None)).unwrap();
    assert_eq!(delays(&doc), [0.1, 0.2, 0.3]);
    assert_eq!(doc.loop_count(), LoopCount::Finite(1));

    let pos = |t| doc.frames().position_at(t, doc.loop_count());
    assert_eq!(pos(0.05), Some(0));
    assert_eq!(pos(0.25), Some(1));
    assert_eq!(pos(0.6), Some(2));
    assert_eq!(pos(0.61), None);
    assert!(doc.frame_at(0.61, None).is_none());
}

#[test]
fn loop_block() {
    let doc = GifDocument::decode(&make_gif(&[10], Some(gif::Repeat::Infinite))).unwrap();
    assert_eq!(doc.loop_count(), LoopCount::Infinite);
    assert!(doc.frame_at(1000., None).is_some());
    assert!(doc.frame_at(1000., Some(LoopCount::Finite(2))).is_none());

    let doc = GifDocument::decode(&make_gif(&[10, 10], Some(gif::Repeat::Finite(3)))).unwrap();
    assert_eq!(doc.loop_count(), LoopCount::Finite(3));
    assert_eq!(doc.frames().position_at(0.55, doc.loop_count()), Some(1));
    assert_eq!(doc.frames().position_at(0.65, doc.loop_count()), None);
}

#[test]
fn unset_delays_get_a_default() {
    let doc = GifDocument::decode(&make_gif(&[0, 1, 7], None)).unwrap();
    assert_eq!(delays(&doc), [DEFAULT_DELAY, 0.01, 0.07]);
}

#[test]
fn frames_are_composited() {
    let doc = GifDocument::decode(&make_gif(&[10, 10, 10], None)).unwrap();
    let pixels: Vec<Vec<RGBA8>> = doc.frames().iter().map(|f| f.pixels().pixels().collect()).collect();
    assert_eq!(pixels, [[RED, GREEN], [GREEN, BLUE], [BLUE, RED]]);
    let frame = doc.frame_at(0.15, None).unwrap();
    assert_eq!((frame.pixels().width(), frame.pixels().height()), (2, 1));
}

#[test]
fn not_gifs() {
    for data in [&b""[..], b"hello", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR", b"GIF89a\x02"] {
        assert!(matches!(GifDocument::decode(data), Err(Error::UnreadableContainer(_))), "{data:?}");
    }
}

#[test]
fn truncated_gif_keeps_leading_frames() {
    let data = make_gif(&[10, 20, 30], None);
    let doc = GifDocument::decode(&data[..data.len() - 5]).unwrap();
    assert!((2..=3).contains(&doc.frames().len()));
    assert_eq!(doc.frames().get(0).unwrap().delay(), 0.1);
    assert_eq!(doc.frames().get(1).unwrap().delay(), 0.2);
}

#[test]
fn named_gif() {
    let mut bundle = ResourceBundle::new();
    bundle.insert("spinner.gif", make_gif(&[5, 5], Some(gif::Repeat::Infinite)));
    let doc = GifDocument::from_named("spinner", &bundle).unwrap();
    assert_eq!(doc.frames().len(), 2);
    assert!(matches!(GifDocument::from_named("spinner.gif", &bundle), Err(Error::ResourceNotFound(_))));
}

#[test]
fn background_load_then_play() {
    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    let mut player = Player::new(Settings::default()).with_completion_handler(done_tx);
    let loader = Loader::new();

    let stale = player.request();
    loader.decode(stale, make_gif(&[10, 10, 10, 10], None)).unwrap();
    let ticket = player.request();
    loader.decode(ticket, make_gif(&[10, 20, 30], None)).unwrap();
    assert_eq!(player.state(), PlaybackState::Loading);

    let t0 = Instant::now();
    for _ in 0..2 {
        let loaded = loader.recv().unwrap();
        player.deliver(loaded.ticket, loaded.result, t0).unwrap();
    }
    assert_eq!(player.state(), PlaybackState::Ready);
    assert_eq!(player.document().unwrap().frames().len(), 3);

    assert!(player.tick(t0 + Duration::from_millis(250)).is_some());
    assert_eq!(player.position(), Some(1));
    assert!(done_rx.try_recv().is_err());
    assert!(player.tick(t0 + Duration::from_millis(700)).is_none());
    assert_eq!(player.state(), PlaybackState::Finished);
    assert!(done_rx.try_recv().is_ok());
    assert!(player.tick(t0 + Duration::from_millis(800)).is_none());
    assert!(done_rx.try_recv().is_err());
}

#[test]
fn poll_installs_and_reports_failures() {
    let mut player = Player::new(Settings::default());
    let loader = Loader::new();

    let ticket = player.request();
    loader.decode(ticket, make_gif(&[10], None)).unwrap();
    let mut installed = false;
    for _ in 0..1000 {
        if player.poll(&loader, Instant::now()).unwrap() {
            installed = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(installed);
    assert_eq!(player.state(), PlaybackState::Ready);

    let ticket = player.request();
    loader.decode(ticket, b"nope".to_vec()).unwrap();
    let loaded = loader.recv().unwrap();
    assert!(player.deliver(loaded.ticket, loaded.result, Instant::now()).is_err());
    assert_eq!(player.state(), PlaybackState::Empty);
}
