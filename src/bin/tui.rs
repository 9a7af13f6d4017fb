//! Terminal dashboard: a synthetic load generator drives the engine on a
//! background thread while the UI renders book depth and throughput from
//! periodic snapshots.
//!
//! The dashboard is a pure consumer of the engine's snapshot read surface.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use tickmatch::{Engine, Side};

const ENGINE_CAPACITY: u32 = 1_000_000;
const DEPTH_SHOWN: usize = 15;

/// How many recently submitted ids the generator remembers as cancel
/// targets
const RECENT_WINDOW: usize = 4_096;

/// Top levels of each side, copied out for the UI thread
#[derive(Default, Clone)]
struct DepthView {
    bids: Vec<(u64, u64)>,
    asks: Vec<(u64, u64)>,
}

struct SharedStats {
    ops_count: AtomicU64,
    trade_count: AtomicU64,
    ns_per_op: AtomicU64,
    pool_used: AtomicU64,
    pool_capacity: AtomicU64,
    depth: RwLock<DepthView>,
}

impl SharedStats {
    fn new(capacity: u64) -> Self {
        Self {
            ops_count: AtomicU64::new(0),
            trade_count: AtomicU64::new(0),
            ns_per_op: AtomicU64::new(0),
            pool_used: AtomicU64::new(0),
            pool_capacity: AtomicU64::new(capacity),
            depth: RwLock::new(DepthView::default()),
        }
    }
}

fn render_depth(levels: &[(u64, u64)]) -> String {
    let mut out = String::new();
    let max_volume = levels.iter().map(|(_, v)| *v).max().unwrap_or(1) as f32;

    for (price, volume) in levels.iter().take(DEPTH_SHOWN) {
        let price_fmt = format!("{:.2}", *price as f64 / 100.0);
        let bar_len = ((*volume as f32 / max_volume) * 20.0) as usize;
        let bar = "█".repeat(bar_len);
        out.push_str(&format!("{price_fmt:>10} {bar} {volume:<7}\n"));
    }
    out
}

/// xorshift64: allocation-free and fast enough to saturate the engine
#[inline]
fn next_rand(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

fn load_generator(stats: Arc<SharedStats>) {
    let mut engine = Engine::with_capacity(ENGINE_CAPACITY);
    engine.warm_up();

    let mut rng = 0x9E37_79B9_7F4A_7C15u64; // any non-zero xorshift seed
    let mut next_id = 1u64;
    let mut batch_count = 0u64;
    let mut trade_total = 0u64;

    // Mid price walks one tick at a time, clamped to a band around
    // $1,000.00 so the ladder never wanders off screen
    const MID_FLOOR: i64 = 90_000;
    const MID_CEIL: i64 = 110_000;
    let mut mid: i64 = 100_000;

    // Wrapping window of recently submitted ids; cancels draw from here.
    // Targets that already filled simply report unknown.
    let mut recent = [0u64; RECENT_WINDOW];

    loop {
        const BATCH: u64 = 256;
        let batch_start = std::time::Instant::now();

        for _ in 0..BATCH {
            let r = next_rand(&mut rng);

            // One-tick walk: down / up / flat in ratio 1:1:2
            let step = match r % 4 {
                0 => -1,
                1 => 1,
                _ => 0,
            };
            mid = (mid + step).clamp(MID_FLOOR, MID_CEIL);

            if r % 5 == 0 && next_id > RECENT_WINDOW as u64 {
                let target = recent[(r >> 8) as usize % RECENT_WINDOW];
                let _ = engine.cancel(target);
            } else {
                let id = next_id;
                next_id += 1;

                let side = if r & 1 == 0 { Side::Buy } else { Side::Sell };

                // Product of two small draws clusters depth near the
                // touch while still seeding levels up to 49 ticks out
                let depth = ((r >> 16) % 8) * ((r >> 24) % 8);
                let price = match side {
                    Side::Buy => (mid - 2 - depth as i64).max(1) as u64,
                    Side::Sell => (mid + 2 + depth as i64) as u64,
                };
                let qty = 5 + (r >> 32) % 250;

                if let Ok(trades) = engine.submit(id, price, qty, side) {
                    trade_total += trades.len() as u64;
                }
                recent[id as usize % RECENT_WINDOW] = id;
            }
        }

        batch_count += 1;

        stats.ops_count.fetch_add(BATCH, Ordering::Relaxed);
        stats.trade_count.store(trade_total, Ordering::Relaxed);
        let ns_per_op = batch_start.elapsed().as_nanos() as u64 / BATCH;
        stats.ns_per_op.store(ns_per_op, Ordering::Relaxed);
        stats
            .pool_used
            .store(engine.live_orders() as u64, Ordering::Relaxed);

        // Publish depth a few times a second; the UI only needs the top of
        // the ladder
        if batch_count % 16 == 0 {
            if let Ok(mut depth) = stats.depth.write() {
                depth.bids = engine
                    .snapshot()
                    .filter(|l| l.side == Side::Buy)
                    .take(DEPTH_SHOWN)
                    .map(|l| (l.price, l.volume))
                    .collect();
                depth.asks = engine
                    .snapshot()
                    .filter(|l| l.side == Side::Sell)
                    .take(DEPTH_SHOWN)
                    .map(|l| (l.price, l.volume))
                    .collect();
            }
        }

        // Hard reset at three quarters full; the demo runs forever
        if engine.live_orders() > ENGINE_CAPACITY / 4 * 3 {
            engine = Engine::with_capacity(ENGINE_CAPACITY);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let stats = Arc::new(SharedStats::new(ENGINE_CAPACITY as u64));
    let generator_stats = stats.clone();
    thread::spawn(move || load_generator(generator_stats));

    let mut last_ops = 0u64;
    let mut last_time = std::time::Instant::now();
    let mut throughput = 0.0f64;

    loop {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q') {
                    break;
                }
            }
        }

        let now = std::time::Instant::now();
        if now.duration_since(last_time).as_secs_f64() >= 1.0 {
            let ops = stats.ops_count.load(Ordering::Relaxed);
            throughput = (ops - last_ops) as f64;
            last_ops = ops;
            last_time = now;
        }

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(12),
                        Constraint::Length(6),
                    ]
                    .as_ref(),
                )
                .split(f.size());

            let header = Block::default().borders(Borders::ALL).title("TICKMATCH");
            let title = Paragraph::new("synthetic flow | press 'q' to quit")
                .block(header)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(title, chunks[0]);

            let book_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(chunks[1]);

            let depth = stats.depth.read().unwrap();
            let bids_text = render_depth(&depth.bids);
            let asks_text = render_depth(&depth.asks);

            let bids_widget = Paragraph::new(bids_text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("BIDS")
                    .style(Style::default().fg(Color::Green)),
            );
            let asks_widget = Paragraph::new(asks_text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("ASKS")
                    .style(Style::default().fg(Color::Red)),
            );
            f.render_widget(bids_widget, book_chunks[0]);
            f.render_widget(asks_widget, book_chunks[1]);

            let ops_fmt = if throughput > 1_000_000.0 {
                format!("{:.2} M", throughput / 1_000_000.0)
            } else {
                format!("{:.0} k", throughput / 1_000.0)
            };
            let trades = stats.trade_count.load(Ordering::Relaxed);
            let pool_used = stats.pool_used.load(Ordering::Relaxed);
            let pool_cap = stats.pool_capacity.load(Ordering::Relaxed);
            let pool_pct = pool_used as f64 / pool_cap as f64 * 100.0;
            let ns_per_op = stats.ns_per_op.load(Ordering::Relaxed);

            let stats_text = format!(
                "throughput: {ops_fmt} ops/sec\nlatency (batch avg): {ns_per_op} ns\ntrades: {trades}\npool: {pool_used} / {pool_cap} ({pool_pct:.1}%)",
            );
            let stats_block = Paragraph::new(stats_text)
                .block(Block::default().borders(Borders::ALL).title("Engine Telemetry"))
                .style(Style::default().fg(Color::Yellow));
            f.render_widget(stats_block, chunks[2]);
        })?;
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(())
}
