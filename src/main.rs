//! Arcade Core headless runner
//!
//! Plays one run of a game with a simple autoplayer through the fixed-timestep
//! frame driver and logs what happened.
//!
//! Usage: `arcade-core [game] [seed] [settings.json]`

use std::path::Path;

use arcade_core::consts::SIM_DT_MS;
use arcade_core::sim::generator::validate_str;
use arcade_core::sim::{
    BoardView, Direction, GameKind, IntentKind, MineTileView, ObjectId, Payload, Snapshot,
    SimulationScheduler,
};
use arcade_core::{HighScores, LogAudio, Settings};

/// Give up after this much simulated time
const MAX_RUN_SECS: f32 = 300.0;
/// Frames between two autoplayer decisions
const THINK_EVERY: u32 = 12;

/// Picks intents from the last snapshot the way a player would
struct Autoplay {
    game: GameKind,
    frames: u32,
    next_cell: usize,
}

impl Autoplay {
    fn new(game: GameKind) -> Self {
        Self {
            game,
            frames: 0,
            next_cell: 0,
        }
    }

    fn decide(&mut self, snap: &Snapshot) -> Option<IntentKind> {
        self.frames += 1;
        if self.frames % THINK_EVERY != 0 {
            return None;
        }
        match self.game {
            GameKind::TokenRain => tap_lowest_valid(snap),
            GameKind::MineShaft => self.dig(snap),
            // Lets the countdown open the valve
            GameKind::PipeFlow => None,
            GameKind::CallStack => {
                let has_frames = matches!(&snap.board, BoardView::Stack { frames, .. } if !frames.is_empty());
                has_frames.then_some(IntentKind::ReturnFrame { id: None })
            }
            GameKind::Snake => chase_food(snap),
        }
    }

    fn dig(&mut self, snap: &Snapshot) -> Option<IntentKind> {
        let BoardView::Mines {
            cols,
            cells,
            challenge,
            ..
        } = &snap.board
        else {
            return None;
        };
        if challenge.is_some() {
            return Some(IntentKind::Answer { choice: 0 });
        }
        let offset = cells
            .iter()
            .skip(self.next_cell)
            .position(|c| *c == MineTileView::Hidden)?;
        let idx = self.next_cell + offset;
        self.next_cell = idx + 1;
        Some(IntentKind::Cell {
            col: (idx % cols) as i64,
            row: (idx / cols) as i64,
        })
    }
}

/// Tap the snippet closest to the floor that parses
fn tap_lowest_valid(snap: &Snapshot) -> Option<IntentKind> {
    snap.objects
        .iter()
        .filter(|o| matches!(&o.payload, Payload::Snippet { text, .. } if validate_str(text)))
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
        .map(|o| IntentKind::Pointer { pos: o.pos })
}

fn chase_food(snap: &Snapshot) -> Option<IntentKind> {
    let BoardView::Snake { heading, .. } = snap.board else {
        return None;
    };
    let mut head: Option<(ObjectId, usize, usize)> = None;
    let mut food = None;
    for obj in &snap.objects {
        match obj.payload {
            Payload::SnakeSegment { col, row } if head.is_none_or(|(id, _, _)| obj.id > id) => {
                head = Some((obj.id, col, row));
            }
            Payload::Food { col, row, .. } => food = Some((col, row)),
            _ => {}
        }
    }
    let ((_, hc, hr), (fc, fr)) = (head?, food?);

    let horizontal = match fc.cmp(&hc) {
        std::cmp::Ordering::Greater => Some(Direction::East),
        std::cmp::Ordering::Less => Some(Direction::West),
        std::cmp::Ordering::Equal => None,
    };
    let vertical = match fr.cmp(&hr) {
        std::cmp::Ordering::Greater => Some(Direction::South),
        std::cmp::Ordering::Less => Some(Direction::North),
        std::cmp::Ordering::Equal => None,
    };
    let want = [horizontal, vertical]
        .into_iter()
        .flatten()
        .find(|d| *d != heading.reverse())?;
    (want != heading).then_some(IntentKind::Steer(want))
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let game = args
        .next()
        .map(|name| {
            GameKind::parse(&name).unwrap_or_else(|| {
                log::warn!("unknown game {name:?}, playing token-rain");
                GameKind::TokenRain
            })
        })
        .unwrap_or(GameKind::TokenRain);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);
    let settings_path = args.next();
    let settings = Settings::load_or_default(settings_path.as_deref().map(Path::new));

    log::info!("Arcade Core (native) playing {} with seed {seed}", game.name());

    let audio = LogAudio::from_settings(&settings);
    let mut sim = SimulationScheduler::new(settings).with_audio(audio);
    let mut bot = Autoplay::new(game);
    sim.submit(0.0, IntentKind::Start { game, seed });

    let mut elapsed_ms = 0.0f32;
    let mut snap = sim.frame(SIM_DT_MS);
    while !snap.mode.is_terminal() && elapsed_ms < MAX_RUN_SECS * 1000.0 {
        if let Some(intent) = bot.decide(&snap) {
            sim.submit(f64::from(elapsed_ms), intent);
        }
        elapsed_ms += SIM_DT_MS;
        snap = sim.frame(SIM_DT_MS);
        if sim.diagnostics().ticks_run % 600 == 0 {
            log::info!("{}", snap.summary());
        }
    }

    log::info!("final: {}", snap.summary());
    match serde_json::to_string(&sim.diagnostics()) {
        Ok(json) => log::info!("diagnostics: {json}"),
        Err(e) => log::warn!("could not encode diagnostics: {e}"),
    }

    let mut board = HighScores::new();
    if let Some(submission) = sim.last_submission() {
        match board.add(submission) {
            Some(rank) => println!("{} scored {} (rank #{rank})", game.name(), submission.score),
            None => println!("{} scored {}", game.name(), submission.score),
        }
    } else {
        println!("{} still running after {MAX_RUN_SECS}s: {}", game.name(), snap.summary());
    }
}
