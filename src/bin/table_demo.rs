use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::{rngs::StdRng, seq::IteratorRandom, Rng, SeedableRng};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use p2p_tables::engine::games::{
    HostCommand, Nim, NimMove, NimState, TicTacToe, TicTacToeMove, TicTacToeState,
};
use p2p_tables::profile::{PlayerKeyMaterial, TableRole};
use p2p_tables::{
    Encoder, GameProcessor, GameRegistry, GameTitle, HostLobbySession, HostTableSession,
    InMemoryTableStorage, LobbyMove, LobbyOptions, LocalRoomHub, PlayerLobbySession, PlayerSeat,
    PlayerTableSession, PrivatePlayerProfile, PublicPlayerProfile, SchemaEncoder, SessionConfig,
    TableSnapshot,
};

const LOG_TARGET: &str = "bin::table_demo";
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "table_demo")]
#[command(about = "Play a bundled game between a host and bots over an in-process room hub", long_about = None)]
struct Args {
    /// Title to play (`nim` or `tic-tac-toe`)
    #[arg(long, env = "TABLE_DEMO_GAME", default_value = "nim")]
    game: String,

    /// Seated players, the host included
    #[arg(long, env = "TABLE_DEMO_PLAYERS", default_value_t = 3)]
    players: usize,

    /// Optional RNG seed for reproducible bot moves
    #[arg(long, env = "TABLE_DEMO_SEED")]
    seed: Option<u64>,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "TABLE_DEMO_LOG_JSON", default_value_t = false)]
    json: bool,

    /// Stop after this many accepted actions even if the game is not over
    #[arg(long, env = "TABLE_DEMO_MAX_TURNS", default_value_t = 200)]
    max_turns: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;
    let summary = run(args).await?;
    println!("{summary}");
    Ok(())
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

/// Picks random legal moves for one of the bundled titles.
enum Strategy {
    TicTacToe(TicTacToe),
    Nim(Nim),
}

impl Strategy {
    fn for_title(title: &GameTitle) -> Result<Self> {
        let tic_tac_toe = TicTacToe::new();
        if &tic_tac_toe.definition().title == title {
            return Ok(Strategy::TicTacToe(tic_tac_toe));
        }
        let nim = Nim::new();
        if &nim.definition().title == title {
            return Ok(Strategy::Nim(nim));
        }
        Err(anyhow!("no bot strategy for `{title}`"))
    }

    fn next_action(&self, state_str: &str, rng: &mut StdRng) -> Result<String> {
        let encoded = match self {
            Strategy::TicTacToe(game) => {
                let state: TicTacToeState = game.state_encoder().decode(state_str)?;
                let cell = state
                    .open_cells()
                    .choose(rng)
                    .ok_or_else(|| anyhow!("no open cell left"))?;
                game.player_action_encoder()
                    .encode(&TicTacToeMove::Place { cell })?
            }
            Strategy::Nim(game) => {
                let state: NimState = game.state_encoder().decode(state_str)?;
                let most = state.max_take.min(state.pile);
                if most == 0 {
                    bail!("pile is empty");
                }
                let count = rng.gen_range(1..=most);
                game.player_action_encoder()
                    .encode(&NimMove::Take { count })?
            }
        };
        Ok(encoded.into_inner())
    }
}

struct Bot {
    profile: PublicPlayerProfile,
    lobby: PlayerLobbySession,
    table: Option<PlayerTableSession>,
}

async fn run(args: Args) -> Result<String> {
    let registry = Arc::new(GameRegistry::with_builtin_games());
    let title = GameTitle::new(args.game.as_str());
    let definition = registry
        .definition(&title)
        .with_context(|| format!("unknown game `{title}`"))?;
    if !definition.accepts_player_count(args.players) {
        bail!(
            "{} takes {}..={} players, not {}",
            definition.display_name,
            definition.min_players,
            definition.max_players,
            args.players
        );
    }
    let strategy = Strategy::for_title(&title)?;
    let config = SessionConfig::from_env().context("invalid session config")?;
    let mut rng = args
        .seed
        .map(StdRng::seed_from_u64)
        .unwrap_or_else(StdRng::from_entropy);

    let hub = LocalRoomHub::new();
    let storage = Arc::new(InMemoryTableStorage::new());
    let host_profile = profile("host", &mut rng);

    let lobby = HostLobbySession::open(
        Arc::new(hub.clone()),
        storage.clone(),
        Arc::clone(&registry),
        config.clone(),
        host_profile.clone(),
        format!("{} demo", definition.display_name),
        LobbyOptions::default(),
    )
    .await?;
    lobby.apply_own_move(LobbyMove::TakeSeat).await?;
    lobby
        .apply_own_move(LobbyMove::SetGameChoice {
            game_choice: title.clone(),
        })
        .await?;

    let mut bots = Vec::with_capacity(args.players - 1);
    let mut host_view = lobby.subscribe();
    for index in 1..args.players {
        let bot_profile = profile(&format!("bot-{index}"), &mut rng);
        let session = PlayerLobbySession::open(
            &hub,
            &config,
            bot_profile.clone(),
            lobby.lobby_id().clone(),
        )
        .await?;
        let mut snapshots = session.subscribe();
        timeout(STEP_TIMEOUT, snapshots.wait_for(Option::is_some))
            .await
            .context("bot never received the lobby")??;
        session.take_seat().await?;
        let seated = index + 1;
        timeout(
            STEP_TIMEOUT,
            host_view.wait_for(|snapshot| snapshot.lobby.player_pool.len() == seated),
        )
        .await
        .context("host never saw the bot take a seat")??;
        bots.push(Bot {
            profile: bot_profile,
            lobby: session,
            table: None,
        });
    }

    let table = lobby.start_game().await?;
    info!(target: LOG_TARGET, table_id = %table.table_id(), "table started");

    let mut seats = HashMap::new();
    for (index, bot) in bots.iter_mut().enumerate() {
        let mut snapshots = bot.lobby.subscribe();
        timeout(
            STEP_TIMEOUT,
            snapshots.wait_for(|s| s.as_ref().is_some_and(|s| s.lobby.is_frozen())),
        )
        .await
        .context("bot never saw the lobby start")??;
        let table_id = bot
            .lobby
            .table_id()
            .ok_or_else(|| anyhow!("bot {index} never learned the table id"))?;
        let session = PlayerTableSession::open(
            &hub,
            Arc::clone(&registry),
            &config,
            bot.profile.clone(),
            table_id,
            TableRole::Player,
        )
        .await?;
        let mut views = session.subscribe();
        let view = timeout(STEP_TIMEOUT, views.wait_for(Option::is_some))
            .await
            .context("bot never received the table")??
            .clone()
            .ok_or_else(|| anyhow!("table view vanished"))?;
        let seat = view
            .my_player_seat
            .ok_or_else(|| anyhow!("bot {index} is not seated"))?;
        seats.insert(seat, index);
        bot.lobby.leave().await?;
        bot.table = Some(session);
    }
    lobby.leave().await?;

    let start = SchemaEncoder::<HostCommand>::new().encode(&HostCommand::Start)?;
    table.submit_host_action(start.as_str()).await?;

    let final_snapshot = play(
        &table,
        &bots,
        &seats,
        &registry,
        &strategy,
        &mut rng,
        args.max_turns,
    )
    .await?;

    for bot in &bots {
        if let Some(session) = &bot.table {
            session.leave().await?;
        }
    }
    table.leave().await?;

    let table = final_snapshot.table;
    info!(
        target: LOG_TARGET,
        phase = %table.table_phase,
        actions = final_snapshot.actions.len(),
        "demo finished"
    );
    Ok(format!(
        "{} [{}] after {} actions: {}",
        definition.display_name,
        table.table_phase,
        final_snapshot.actions.len(),
        table.current_status_description
    ))
}

async fn play(
    table: &HostTableSession,
    bots: &[Bot],
    seats: &HashMap<PlayerSeat, usize>,
    registry: &GameRegistry,
    strategy: &Strategy,
    rng: &mut StdRng,
    max_turns: usize,
) -> Result<TableSnapshot> {
    let processor = registry.get(&table.snapshot().await.table.game_title)?;
    let mut updates = table.updates();

    for _ in 0..max_turns {
        let snapshot = table.snapshot().await;
        if snapshot.table.table_phase.is_terminal() {
            return Ok(snapshot);
        }
        let state_str = snapshot
            .actions
            .last()
            .map(|entry| entry.next_game_state_str.clone())
            .ok_or_else(|| anyhow!("table has an empty log"))?;
        let Some(seat) = processor.next_to_act(state_str.as_str())?.first().copied() else {
            warn!(target: LOG_TARGET, "nobody is due to act; stopping");
            return Ok(snapshot);
        };

        match seats.get(&seat).and_then(|index| bots[*index].table.as_ref()) {
            Some(bot) => {
                let expected = snapshot.actions.len();
                let mut views = bot.subscribe();
                let view = timeout(
                    STEP_TIMEOUT,
                    views.wait_for(|view| view.as_ref().is_some_and(|v| v.action_count == expected)),
                )
                .await
                .context("bot fell behind the host")??
                .clone()
                .ok_or_else(|| anyhow!("table view vanished"))?;
                let bot_state = view
                    .latest_state_str
                    .ok_or_else(|| anyhow!("bot has no state"))?;
                let action = strategy.next_action(bot_state.as_str(), rng)?;
                debug!(target: LOG_TARGET, %seat, %action, "bot submits");
                bot.submit_action(action).await?;
                timeout(STEP_TIMEOUT, updates.recv())
                    .await
                    .context("host did not accept the bot's action")??;
            }
            None => {
                let action = strategy.next_action(state_str.as_str(), rng)?;
                debug!(target: LOG_TARGET, %seat, %action, "host submits");
                table.submit_own_action(&action).await?;
                updates.recv().await?;
            }
        }
    }

    warn!(target: LOG_TARGET, max_turns, "turn limit reached before the game ended");
    Ok(table.snapshot().await)
}

fn profile(handle: &str, rng: &mut StdRng) -> PublicPlayerProfile {
    PrivatePlayerProfile::new(handle, PlayerKeyMaterial::ephemeral(rng), Utc::now()).to_public()
}
