use super::*;
use crate::config::EngineSettings;
use crate::library::Track;
use approx::assert_relative_eq;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GraphState {
    active: bool,
    finished: bool,
    started: Vec<(String, f64)>,
    halts: usize,
    gain: f32,
    faded: Option<Duration>,
}

#[derive(Clone, Default)]
struct FakeGraph(Arc<Mutex<GraphState>>);

impl FakeGraph {
    fn finish(&self) {
        self.0.lock().unwrap().finished = true;
    }

    fn started(&self) -> Vec<(String, f64)> {
        self.0.lock().unwrap().started.clone()
    }

    fn gain(&self) -> f32 {
        self.0.lock().unwrap().gain
    }

    fn active(&self) -> bool {
        self.0.lock().unwrap().active
    }
}

impl AudioGraph for FakeGraph {
    fn start_source(&mut self, asset: &DecodedAsset, offset: f64, gain: f32) {
        let mut s = self.0.lock().unwrap();
        s.active = true;
        s.finished = false;
        s.gain = gain;
        s.started.push((asset.track_id().to_string(), offset));
    }

    fn halt_source(&mut self) {
        let mut s = self.0.lock().unwrap();
        if s.active {
            s.halts += 1;
        }
        s.active = false;
        s.finished = false;
    }

    fn set_gain(&mut self, gain: f32) {
        self.0.lock().unwrap().gain = gain;
    }

    fn source_finished(&self) -> bool {
        let s = self.0.lock().unwrap();
        s.active && s.finished
    }

    fn fade_out(&mut self, duration: Duration) {
        self.0.lock().unwrap().faded = Some(duration);
    }
}

#[derive(Clone, Default)]
struct ManualClock(Arc<Mutex<f64>>);

impl ManualClock {
    fn advance(&self, secs: f64) {
        *self.0.lock().unwrap() += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}

type Recorded = Arc<Mutex<Vec<EngineEvent>>>;

fn record(bus: &EventBus) -> (Recorded, Subscription) {
    let log: Recorded = Arc::default();
    let l = log.clone();
    let sub = bus.subscribe_all(move |e| l.lock().unwrap().push(e.clone()));
    (log, sub)
}

fn take(log: &Recorded) -> Vec<EngineEvent> {
    std::mem::take(&mut *log.lock().unwrap())
}

fn count(log: &Recorded, kind: EventKind) -> usize {
    log.lock().unwrap().iter().filter(|e| e.kind() == kind).count()
}

fn track(id: &str) -> Track {
    Track::new(id, format!("http://catalog.test/stream/{id}"))
}

/// Silent mono asset at 1 kHz, long enough for `seconds`.
fn asset(id: &str, seconds: f64) -> DecodedAsset {
    DecodedAsset::from_samples(id, vec![0.0; (seconds * 1000.0) as usize], 1, 1000)
}

struct Harness {
    core: EngineCore<FakeGraph, ManualClock>,
    graph: FakeGraph,
    clock: ManualClock,
    playback: PlaybackHandle,
    log: Recorded,
    _sub: Subscription,
}

fn harness() -> Harness {
    let graph = FakeGraph::default();
    let clock = ManualClock::default();
    clock.advance(1000.0);
    let events = EventBus::new();
    let (log, sub) = record(&events);
    let playback: PlaybackHandle = Arc::default();
    let core = EngineCore::new(graph.clone(), clock.clone(), events, playback.clone(), 1.0);
    Harness {
        core,
        graph,
        clock,
        playback,
        log,
        _sub: sub,
    }
}

impl Harness {
    /// Play `id` and complete its load with an asset of `seconds`.
    fn play_loaded(&mut self, id: &str, seconds: f64) {
        let PlayStep::Fetch(ticket) = self.core.play(track(id)).unwrap() else {
            panic!("expected a fetch for {id}");
        };
        let status = self.core.finish_load(ticket, Ok(asset(id, seconds))).unwrap();
        assert_eq!(status, LoadStatus::Ready);
    }
}

fn wav_bytes(seconds: f32, sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (seconds * sample_rate as f32) as usize;
        for i in 0..frames {
            let s = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[test]
fn decode_wav_payload() {
    let decoded = DecodedAsset::decode("w", wav_bytes(0.5, 8000, 2)).unwrap();
    assert_eq!(decoded.track_id(), "w");
    assert_eq!(decoded.channels(), 2);
    assert_eq!(decoded.sample_rate(), 8000);
    assert_relative_eq!(decoded.duration(), 0.5, epsilon = 0.01);
}

#[test]
fn decode_rejects_empty_and_garbage() {
    assert_eq!(DecodedAsset::decode("e", Vec::new()).unwrap_err(), LoadError::Empty);
    let garbage = b"definitely not an audio container".to_vec();
    assert!(matches!(
        DecodedAsset::decode("g", garbage),
        Err(LoadError::Decode(_))
    ));
}

#[test]
fn asset_offsets_are_clamped() {
    let a = DecodedAsset::from_samples("s", vec![0.0; 200], 2, 100);
    assert_relative_eq!(a.duration(), 1.0);
    assert_eq!(a.frame_at(-3.0), 0);
    assert_eq!(a.frame_at(0.5), 50);
    assert_eq!(a.frame_at(9.0), 100);
    assert_eq!(a.samples_from(0.5).len(), 100);
    assert!(a.samples_from(2.0).is_empty());
}

#[test]
fn mono_window_pads_before_start() {
    let a = DecodedAsset::from_samples("s", vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0], 2, 10);
    let w = a.mono_window(2, 4);
    assert_eq!(w, vec![0.0, 0.0, 0.5, 0.5]);
}

// ---------------------------------------------------------------------------
// Engine core
// ---------------------------------------------------------------------------

#[test]
fn play_emits_lifecycle_in_order() {
    let mut h = harness();
    h.play_loaded("a", 10.0);

    assert_eq!(
        take(&h.log),
        vec![
            EngineEvent::Loading(true),
            EngineEvent::Loading(false),
            EngineEvent::Loaded { duration: 10.0 },
            EngineEvent::Play(Position {
                current_time: 0.0,
                duration: 10.0
            }),
        ]
    );
    assert_eq!(h.core.transport(), Transport::Playing);
    assert_eq!(h.graph.started(), vec![("a".to_string(), 0.0)]);
    assert_eq!(h.core.current_track().map(|t| t.id.as_str()), Some("a"));
}

#[test]
fn invalid_track_is_rejected_before_any_io() {
    let mut h = harness();
    let err = h.core.play(Track::new("", "http://x")).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTrack(_)));
    let err = h.core.play(Track::new("a", "  ")).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTrack(_)));

    assert_eq!(count(&h.log, EventKind::Loading), 0);
    assert_eq!(count(&h.log, EventKind::Error), 2);
    assert!(!h.core.is_loading());
    assert!(h.graph.started().is_empty());
}

#[test]
fn pause_resume_preserves_elapsed_time() {
    let mut h = harness();
    h.play_loaded("a", 10.0);
    take(&h.log);

    h.clock.advance(3.25);
    h.core.pause();
    assert_eq!(h.core.transport(), Transport::Paused);
    assert_relative_eq!(h.core.current_time(), 3.25, epsilon = 1e-9);

    h.clock.advance(120.0);
    assert_relative_eq!(h.core.current_time(), 3.25, epsilon = 1e-9);

    h.core.resume().unwrap();
    assert_relative_eq!(h.core.current_time(), 3.25, epsilon = 1e-9);
    h.clock.advance(1.5);
    assert_relative_eq!(h.core.current_time(), 4.75, epsilon = 1e-9);

    let events = take(&h.log);
    assert_eq!(
        events,
        vec![
            EngineEvent::Pause(Position {
                current_time: 3.25,
                duration: 10.0
            }),
            EngineEvent::Play(Position {
                current_time: 3.25,
                duration: 10.0
            }),
        ]
    );
    let started = h.graph.started();
    assert_relative_eq!(started[1].1, 3.25, epsilon = 1e-9);
}

#[test]
fn repeated_pause_resume_cycles_lose_no_time() {
    let mut h = harness();
    h.play_loaded("a", 60.0);
    let mut played = 0.0;
    for step in [0.4, 1.1, 2.7, 0.05] {
        h.clock.advance(step);
        played += step;
        h.core.pause();
        h.clock.advance(9.0);
        h.core.resume().unwrap();
        assert_relative_eq!(h.core.current_time(), played, epsilon = 1e-9);
    }
}

#[test]
fn interruptions_never_report_ended() {
    let mut h = harness();
    h.play_loaded("a", 10.0);
    h.clock.advance(1.0);
    h.core.tick();
    h.core.pause();
    h.core.tick();
    h.core.resume().unwrap();
    h.core.seek(4.0).unwrap();
    h.core.tick();
    h.play_loaded("b", 5.0);
    h.core.tick();
    h.core.stop();
    h.core.tick();

    assert_eq!(count(&h.log, EventKind::Ended), 0);
    assert!(h.graph.0.lock().unwrap().halts >= 4);
}

#[test]
fn natural_end_resets_session_and_reports_once() {
    let mut h = harness();
    h.play_loaded("a", 2.0);
    h.clock.advance(2.0);
    h.graph.finish();
    h.core.tick();
    h.core.tick();

    assert_eq!(count(&h.log, EventKind::Ended), 1);
    assert_eq!(h.core.transport(), Transport::Stopped);
    assert_relative_eq!(h.core.current_time(), 0.0);
    assert!(!h.graph.active());
    // The asset stays resident: replaying starts without a fetch.
    assert_eq!(h.core.play(track("a")).unwrap(), PlayStep::Started);
}

#[test]
fn time_updates_only_while_playing() {
    let mut h = harness();
    h.core.tick();
    h.play_loaded("a", 8.0);
    take(&h.log);

    h.clock.advance(2.0);
    h.core.tick();
    assert_eq!(
        take(&h.log),
        vec![EngineEvent::TimeUpdate(Progress {
            current_time: 2.0,
            duration: 8.0,
            progress: 0.25
        })]
    );

    h.core.pause();
    take(&h.log);
    h.core.tick();
    h.core.stop();
    take(&h.log);
    h.core.tick();
    assert!(take(&h.log).is_empty());
}

#[test]
fn seek_clamps_to_asset_bounds() {
    let mut h = harness();
    h.play_loaded("a", 30.0);
    take(&h.log);

    h.core.seek(-5.0).unwrap();
    h.core.seek(130.0).unwrap();
    h.core.seek(f64::NAN).unwrap();

    let offsets: Vec<f64> = h.graph.started().iter().skip(1).map(|(_, o)| *o).collect();
    assert_eq!(offsets, vec![0.0, 30.0, 0.0]);

    let events = take(&h.log);
    assert_eq!(events[0], EngineEvent::TimeUpdate(Progress::new(0.0, 30.0)));
    assert_eq!(
        events[3],
        EngineEvent::Play(Position {
            current_time: 30.0,
            duration: 30.0
        })
    );
}

#[test]
fn seek_from_pause_resumes_playback() {
    let mut h = harness();
    h.play_loaded("a", 30.0);
    h.clock.advance(5.0);
    h.core.pause();
    take(&h.log);

    h.core.seek(12.0).unwrap();
    assert_eq!(h.core.transport(), Transport::Playing);
    assert_relative_eq!(h.core.current_time(), 12.0, epsilon = 1e-9);
    let kinds: Vec<EventKind> = take(&h.log).iter().map(EngineEvent::kind).collect();
    assert_eq!(kinds, vec![EventKind::TimeUpdate, EventKind::Play]);
}

#[test]
fn seek_without_asset_fails() {
    let mut h = harness();
    assert_eq!(h.core.seek(3.0).unwrap_err(), EngineError::NoAsset);
    assert_eq!(count(&h.log, EventKind::Error), 1);
}

#[test]
fn stale_load_is_ignored() {
    let mut h = harness();
    let PlayStep::Fetch(ticket_a) = h.core.play(track("a")).unwrap() else {
        panic!("a should need a fetch");
    };
    let PlayStep::Fetch(ticket_b) = h.core.play(track("b")).unwrap() else {
        panic!("b should need a fetch");
    };
    assert!(ticket_b.generation > ticket_a.generation);

    let status = h.core.finish_load(ticket_a.clone(), Ok(asset("a", 4.0))).unwrap();
    assert_eq!(status, LoadStatus::Stale);
    assert!(h.graph.started().is_empty());
    assert_eq!(h.core.current_track().map(|t| t.id.as_str()), Some("b"));

    h.core.finish_load(ticket_b, Ok(asset("b", 6.0))).unwrap();
    // Late again, after b is already playing.
    let status = h.core.finish_load(ticket_a, Ok(asset("a", 4.0))).unwrap();
    assert_eq!(status, LoadStatus::Stale);

    assert_eq!(h.graph.started(), vec![("b".to_string(), 0.0)]);
    assert_relative_eq!(h.core.duration(), 6.0);
}

#[test]
fn failed_load_cleans_up_and_reports() {
    let mut h = harness();
    h.play_loaded("a", 10.0);
    take(&h.log);

    let PlayStep::Fetch(ticket) = h.core.play(track("b")).unwrap() else {
        panic!("b should need a fetch");
    };
    let err = h.core.finish_load(ticket, Err(LoadError::Status(404))).unwrap_err();
    assert_eq!(err, EngineError::Load(LoadError::Status(404)));

    let events = take(&h.log);
    assert_eq!(events[0], EngineEvent::Loading(true));
    assert_eq!(events[1], EngineEvent::Loading(false));
    assert!(matches!(&events[2], EngineEvent::Error(msg) if msg.contains("404")));
    assert!(h.core.current_track().is_none());
    assert_relative_eq!(h.core.duration(), 0.0);
    assert_eq!(h.core.transport(), Transport::Stopped);
    assert!(!h.core.is_loading());

    // Retrying goes back to the network.
    assert!(matches!(h.core.play(track("b")).unwrap(), PlayStep::Fetch(_)));
}

#[test]
fn stop_is_idempotent_and_clears_error() {
    let mut h = harness();
    h.play_loaded("a", 10.0);
    h.clock.advance(3.0);
    take(&h.log);

    h.core.stop();
    h.core.stop();
    assert_eq!(
        take(&h.log),
        vec![
            EngineEvent::Stop,
            EngineEvent::ClearError,
            EngineEvent::Stop,
            EngineEvent::ClearError,
        ]
    );
    assert_eq!(h.core.transport(), Transport::Stopped);
    assert_relative_eq!(h.core.current_time(), 0.0);
}

#[test]
fn stop_abandons_pending_load() {
    let mut h = harness();
    let PlayStep::Fetch(ticket) = h.core.play(track("a")).unwrap() else {
        panic!("a should need a fetch");
    };
    take(&h.log);
    h.core.stop();
    assert_eq!(take(&h.log)[0], EngineEvent::Loading(false));
    assert!(h.core.current_track().is_none());
    assert!(h.playback.lock().unwrap().track.is_none());

    let status = h.core.finish_load(ticket, Ok(asset("a", 3.0))).unwrap();
    assert_eq!(status, LoadStatus::Stale);
    assert!(h.graph.started().is_empty());
}

#[test]
fn load_is_a_no_op_when_resident_or_pending() {
    let mut h = harness();
    let LoadStep::Fetch(ticket) = h.core.load(&track("a")).unwrap() else {
        panic!("a should need a fetch");
    };
    assert_eq!(
        h.core.load(&track("a")).unwrap(),
        LoadStep::Pending(ticket.generation)
    );
    h.core.finish_load(ticket, Ok(asset("a", 3.0))).unwrap();
    assert_eq!(h.core.load(&track("a")).unwrap(), LoadStep::Resident);

    // A standalone load does not start playback.
    assert!(h.graph.started().is_empty());
    assert_eq!(h.core.transport(), Transport::Stopped);
    assert_eq!(count(&h.log, EventKind::Loaded), 1);
}

#[test]
fn standalone_load_takes_over_graph_when_ready() {
    let mut h = harness();
    h.play_loaded("a", 10.0);
    let LoadStep::Fetch(ticket) = h.core.load(&track("b")).unwrap() else {
        panic!("b should need a fetch");
    };
    // a keeps playing while b downloads.
    assert_eq!(h.core.transport(), Transport::Playing);

    h.core.finish_load(ticket, Ok(asset("b", 5.0))).unwrap();
    assert_eq!(h.core.transport(), Transport::Stopped);
    assert!(!h.graph.active());
    assert_eq!(h.core.current_track().map(|t| t.id.as_str()), Some("b"));
    assert_eq!(count(&h.log, EventKind::Ended), 0);
    assert_eq!(count(&h.log, EventKind::Stop), 1);
}

#[test]
fn failed_preload_stops_the_playing_track() {
    let mut h = harness();
    h.play_loaded("a", 10.0);
    h.clock.advance(2.0);
    let LoadStep::Fetch(ticket) = h.core.load(&track("b")).unwrap() else {
        panic!("b should need a fetch");
    };
    take(&h.log);

    let err = h
        .core
        .finish_load(ticket, Err(LoadError::Network("connection reset".into())))
        .unwrap_err();
    assert!(matches!(err, EngineError::Load(LoadError::Network(_))));

    let kinds: Vec<EventKind> = take(&h.log).iter().map(EngineEvent::kind).collect();
    assert_eq!(kinds, vec![EventKind::Stop, EventKind::Loading, EventKind::Error]);
    assert_eq!(h.core.transport(), Transport::Stopped);
    assert!(!h.graph.active());
    assert!(h.core.current_track().is_none());
}

#[test]
fn replaying_resident_track_skips_fetch() {
    let mut h = harness();
    h.play_loaded("a", 10.0);
    h.clock.advance(4.0);
    take(&h.log);

    assert_eq!(h.core.play(track("a")).unwrap(), PlayStep::Started);
    assert_relative_eq!(h.core.current_time(), 0.0);
    assert_eq!(
        take(&h.log),
        vec![EngineEvent::Play(Position {
            current_time: 0.0,
            duration: 10.0
        })]
    );
}

#[test]
fn pause_and_resume_are_no_ops_out_of_state() {
    let mut h = harness();
    h.core.pause();
    h.core.resume().unwrap();
    h.play_loaded("a", 10.0);
    take(&h.log);
    h.core.resume().unwrap();
    h.core.pause();
    h.core.pause();
    assert_eq!(count(&h.log, EventKind::Pause), 1);
    assert_eq!(count(&h.log, EventKind::Play), 0);
}

#[test]
fn volume_is_passed_through_unclamped() {
    let mut h = harness();
    h.core.set_volume(1.5);
    assert_relative_eq!(h.graph.gain(), 1.5);
    assert_relative_eq!(h.core.volume(), 1.5);
    assert_eq!(take(&h.log), vec![EngineEvent::VolumeChange(1.5)]);
}

#[test]
fn mute_silences_and_restores_gain() {
    let mut h = harness();
    h.core.set_volume(0.6);
    take(&h.log);

    assert!(h.core.toggle_mute());
    assert_relative_eq!(h.graph.gain(), 0.0);
    h.play_loaded("a", 5.0);
    assert_relative_eq!(h.graph.gain(), 0.0);

    assert!(!h.core.toggle_mute());
    assert_relative_eq!(h.graph.gain(), 0.6);
    let volumes: Vec<EngineEvent> = take(&h.log)
        .into_iter()
        .filter(|e| e.kind() == EventKind::VolumeChange)
        .collect();
    assert_eq!(
        volumes,
        vec![EngineEvent::VolumeChange(0.0), EngineEvent::VolumeChange(0.6)]
    );
}

#[test]
fn frequency_data_shape_follows_state() {
    let mut h = harness();
    assert!(h.core.frequency_data().is_empty());

    h.play_loaded("a", 5.0);
    h.clock.advance(1.0);
    assert_eq!(h.core.frequency_data().len(), FREQUENCY_BIN_COUNT);

    h.core.pause();
    assert_eq!(h.core.frequency_data(), vec![0u8; FREQUENCY_BIN_COUNT]);
}

#[test]
fn snapshot_tracks_engine_state() {
    let mut h = harness();
    h.play_loaded("a", 7.0);
    h.clock.advance(2.0);
    h.core.pause();

    let info = h.playback.lock().unwrap().clone();
    assert_eq!(info.track.map(|t| t.id), Some("a".to_string()));
    assert_eq!(info.duration, Some(7.0));
    assert!(info.session.is_paused());
    assert_relative_eq!(info.session.current_time(0.0), 2.0, epsilon = 1e-9);
}

#[test]
fn shutdown_fades_only_when_playing() {
    let mut h = harness();
    h.play_loaded("a", 5.0);
    h.core.shutdown(Duration::from_millis(300));
    assert_eq!(h.graph.0.lock().unwrap().faded, Some(Duration::from_millis(300)));
    assert!(!h.graph.active());
    assert_eq!(count(&h.log, EventKind::Ended), 0);
}

// ---------------------------------------------------------------------------
// Engine thread
// ---------------------------------------------------------------------------

/// Serves fixed payloads; requests for `gated` wait for a permit.
struct GatedFetcher {
    bodies: HashMap<String, Vec<u8>>,
    gated: Option<String>,
    gate: Arc<Semaphore>,
}

impl GatedFetcher {
    fn new(ids: &[&str]) -> Self {
        let bodies = ids
            .iter()
            .map(|id| (track(id).url, wav_bytes(0.5, 8000, 1)))
            .collect();
        Self {
            bodies,
            gated: None,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    fn gate(mut self, id: &str) -> Self {
        self.gated = Some(track(id).url);
        self
    }
}

#[async_trait]
impl TrackFetcher for GatedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        if self.gated.as_deref() == Some(url) {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| LoadError::Network(e.to_string()))?;
        }
        self.bodies.get(url).cloned().ok_or(LoadError::Status(404))
    }
}

fn fast_settings() -> EngineSettings {
    EngineSettings {
        time_update_interval_ms: 10,
        ..EngineSettings::default()
    }
}

fn engine(graph: &FakeGraph, fetcher: impl TrackFetcher) -> AudioEngine {
    let g = graph.clone();
    AudioEngine::with_graph(move || Ok(g), Arc::new(fetcher), &fast_settings()).unwrap()
}

#[tokio::test]
async fn engine_plays_and_reports_state() {
    let graph = FakeGraph::default();
    let engine = engine(&graph, GatedFetcher::new(&["a"]));

    engine.play(&track("a")).await.unwrap();
    assert_eq!(engine.transport(), Transport::Playing);
    assert_eq!(engine.current_track().map(|t| t.id), Some("a".to_string()));
    assert_relative_eq!(engine.duration().unwrap(), 0.5, epsilon = 0.01);

    engine.pause().await.unwrap();
    let paused_at = engine.current_time();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_relative_eq!(engine.current_time(), paused_at);

    engine.resume().await.unwrap();
    assert_eq!(engine.transport(), Transport::Playing);

    engine.set_volume(0.25).await.unwrap();
    assert_relative_eq!(engine.volume(), 0.25);
    assert_relative_eq!(graph.gain(), 0.25);

    engine.shutdown(Duration::ZERO).await;
    assert_eq!(engine.pause().await.unwrap_err(), EngineError::Closed);
}

#[tokio::test]
async fn engine_load_failure_surfaces_error() {
    let graph = FakeGraph::default();
    let engine = engine(&graph, GatedFetcher::new(&[]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = engine.subscribe(EventKind::Error, move |e| {
        let _ = tx.send(e.clone());
    });

    let err = engine.play(&track("missing")).await.unwrap_err();
    assert_eq!(err, EngineError::Load(LoadError::Status(404)));
    assert!(matches!(rx.recv().await, Some(EngineEvent::Error(_))));
    assert!(engine.current_track().is_none());
    engine.shutdown(Duration::ZERO).await;
}

#[tokio::test]
async fn engine_ignores_superseded_load() {
    let graph = FakeGraph::default();
    let fetcher = GatedFetcher::new(&["slow", "fast"]).gate("slow");
    let gate = fetcher.gate.clone();
    let engine = Arc::new(engine(&graph, fetcher));

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.play(&track("slow")).await })
    };
    // Let the first request reach the engine before the second.
    tokio::time::sleep(Duration::from_millis(20)).await;

    engine.play(&track("fast")).await.unwrap();
    assert_eq!(first.await.unwrap().unwrap_err(), EngineError::Superseded);

    gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(graph.started(), vec![("fast".to_string(), 0.0)]);
    assert_eq!(engine.current_track().map(|t| t.id), Some("fast".to_string()));
    engine.shutdown(Duration::ZERO).await;
}

#[tokio::test]
async fn engine_reports_natural_end() {
    let graph = FakeGraph::default();
    let engine = engine(&graph, GatedFetcher::new(&["a"]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = engine.subscribe(EventKind::Ended, move |_| {
        let _ = tx.send(());
    });

    engine.play(&track("a")).await.unwrap();
    engine.seek(0.2).await.unwrap();
    graph.finish();

    let ended = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
    assert_eq!(ended.unwrap(), Some(()));
    assert_eq!(engine.transport(), Transport::Stopped);
    engine.shutdown(Duration::ZERO).await;
}

#[tokio::test]
async fn engine_spawn_fails_when_graph_cannot_open() {
    let result = AudioEngine::with_graph(
        || Err::<FakeGraph, _>(EngineError::Output("no device".into())),
        Arc::new(GatedFetcher::new(&[])),
        &fast_settings(),
    );
    assert!(matches!(result, Err(EngineError::Output(_))));
}
