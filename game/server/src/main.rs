//! The game server binary (spec §4.8, §5, §6): spawns the I/O reactor on its
//! own thread, owns the ECS `Engine`/`GameState`/dispatcher on the main
//! thread, and drives the fixed 8ms tick loop between them.
//!
//! Grounded in `gamerunner`'s role as the teacher's tick-loop binary; the
//! teacher's own `main.rs` predates the crates this repo now builds on
//! (`flux`, `neutronium`) and was rewritten from scratch against
//! `rtype-transport`/`rtype-eventbus`/`rtype-dispatcher`/`gamecore` instead.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{App, Arg};
use gamecore::dispatch::{self, GameCtx, IoEventBus, IoEventPublisher};
use gamecore::{constants, state, systems, GameConfig};
use rtype_common::logging;
use rtype_dispatcher::{Dispatcher, Origin};
use rtype_ecs::Engine;
use rtype_eventbus::EventBus;
use rtype_protocol::codec::{create_packet_array, FixedSize};
use rtype_protocol::packet_type::PacketType;
use rtype_protocol::payload::{UpdateEnemy, UpdatePlayer, UpdateProjectile};
use rtype_transport::{IoEvent, OutboundQueue, Server};
use signal_hook::iterator::Signals;
use slog::Logger;

/// Packet-carrying event kinds (`IoEvent::TcpPacket`/`UdpDatagram`), budgeted
/// through `try_recv` (spec §4.8 step 1). Lifecycle kinds (`Accepted`/
/// `Disconnected`, kinds 0/1) are drained unconditionally via `process_kind`.
const TCP_PACKET_KIND: usize = 2;
const UDP_DATAGRAM_KIND: usize = 3;

/// Maximum UDP datagram body (spec §4.8 step 4): `floor(1400 / sizeof(Update))`.
const UDP_DELTA_BUDGET_BYTES: usize = 1400;

fn main() {
    let matches = App::new("R-Type Game Server")
        .version("1.0")
        .author("Bush Hammer Industries")
        .about("Runs the real-time game simulation server.")
        .arg(Arg::with_name("TCP_PORT").help("TCP listen port").required(true))
        .arg(Arg::with_name("UDP_PORT").help("UDP listen port").required(true))
        .arg(Arg::with_name("config").long("config").takes_value(true).help("Path to game_config.toml"))
        .arg(Arg::with_name("log-config").long("log-config").takes_value(true).help("Path to a sloggers TOML config"))
        .get_matches();

    let log = logging::init(matches.value_of("log-config"));

    let tcp_port: u16 = matches.value_of("TCP_PORT").unwrap().parse().expect("TCP_PORT must be a u16");
    let udp_port: u16 = matches.value_of("UDP_PORT").unwrap().parse().expect("UDP_PORT must be a u16");

    let config = match matches.value_of("config") {
        Some(path) => serdeconv::from_toml_file(path).unwrap_or_else(|err| {
            slog::warn!(log, "failed to read game config, using defaults"; "path" => path, "error" => %err);
            GameConfig::default()
        }),
        None => GameConfig::default(),
    };

    let shutdown = install_shutdown_handler(&log);
    run(tcp_port, udp_port, config, shutdown, log);
}

/// Registers a background thread that turns `SIGINT`/`SIGTERM` into a shared
/// flag the tick loop polls once per iteration, the way
/// `examples/andrewgazelka-hyperion`'s server loop does.
fn install_shutdown_handler(log: &Logger) -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    let log = log.new(slog::o!("component" => "shutdown"));
    let mut signals = Signals::new([signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM])
        .expect("failed to install signal handler");
    thread::spawn(move || {
        for signal in signals.forever() {
            slog::warn!(log, "received shutdown signal"; "signal" => signal);
            flag.store(true, Ordering::SeqCst);
            break;
        }
    });
    shutdown
}

fn run(tcp_port: u16, udp_port: u16, config: GameConfig, shutdown: Arc<AtomicBool>, log: Logger) {
    let tcp_addr: SocketAddr = format!("0.0.0.0:{}", tcp_port).parse().expect("invalid TCP bind address");
    let udp_addr: SocketAddr = format!("0.0.0.0:{}", udp_port).parse().expect("invalid UDP bind address");

    let (outbound, outbound_rx) = OutboundQueue::channel();
    let (io_bus, io_publisher): (IoEventBus, IoEventPublisher) = EventBus::new(&log);

    let io_log = log.new(slog::o!("thread" => "io"));
    let io_shutdown = Arc::clone(&shutdown);
    let io_handle = thread::spawn(move || {
        io_thread_main(tcp_addr, udp_addr, io_publisher, outbound_rx, io_shutdown, io_log);
    });

    simulation_main(config, io_bus, outbound, shutdown, log.new(slog::o!("thread" => "sim")));

    if io_handle.join().is_err() {
        slog::error!(log, "io thread panicked");
    }
}

/// The I/O thread's own loop (spec §5): owns the `Server` exclusively, polls
/// for readiness, publishes every event it produces onto the bus, and
/// applies every `OutCommand` the simulation thread has queued since the
/// last iteration.
fn io_thread_main(
    tcp_addr: SocketAddr,
    udp_addr: SocketAddr,
    publisher: IoEventPublisher,
    outbound_rx: crossbeam_channel::Receiver<rtype_transport::OutCommand>,
    shutdown: Arc<AtomicBool>,
    log: Logger,
) {
    let mut server = match Server::bind(tcp_addr, udp_addr, &log) {
        Ok(server) => server,
        Err(err) => {
            slog::error!(log, "failed to bind server"; "error" => %err);
            return;
        }
    };
    slog::info!(log, "io reactor listening"; "tcp" => %tcp_addr, "udp" => %udp_addr);

    while !shutdown.load(Ordering::Relaxed) {
        match server.poll(Duration::from_millis(constants::TICK_PERIOD_MS)) {
            Ok(events) => {
                for event in events {
                    publisher.publish(event);
                }
            }
            Err(err) => slog::warn!(log, "reactor poll error"; "error" => ?err),
        }
        while let Ok(command) = outbound_rx.try_recv() {
            server.apply(command);
        }
    }
    slog::info!(log, "io thread shutting down");
}

/// The simulation thread's loop: owns `Engine`/`GameState` exclusively (spec
/// §5) and drives the fixed tick described in spec §4.8.
fn simulation_main(
    config: GameConfig,
    mut event_bus: IoEventBus,
    outbound: OutboundQueue,
    shutdown: Arc<AtomicBool>,
    log: Logger,
) {
    let engine = Rc::new(RefCell::new(Engine::new()));
    state::register_components(&mut engine.borrow_mut().registry);
    let game_state = Rc::new(RefCell::new(state::GameState::new(outbound, &log)));
    systems::install_all(&mut engine.borrow_mut(), Rc::clone(&game_state));

    let mut dispatcher: Dispatcher<GameCtx> = Dispatcher::new(&log);
    dispatch::install(&mut dispatcher, &mut event_bus, Rc::clone(&engine), Rc::clone(&game_state), &log);
    let mut ctx = GameCtx { engine: Rc::clone(&engine), state: Rc::clone(&game_state) };

    let tick_period = Duration::from_millis(config.game.tick_ms);
    let tick_seconds = config.game.tick_ms as f32 / 1000.0;
    let started = Instant::now();
    let mut tick: u64 = 0;
    let mut deadline = Instant::now() + tick_period;

    slog::info!(log, "simulation started"; "tick_ms" => config.game.tick_ms);

    while !shutdown.load(Ordering::Relaxed) {
        drain_inbound(&mut event_bus, &mut dispatcher, &mut ctx);

        let now_ms = started.elapsed().as_millis() as u64;
        {
            let mut engine = engine.borrow_mut();
            engine.set_now(now_ms);
            engine.update(tick_seconds);
        }

        broadcast_dirty_deltas(&mut engine.borrow_mut().registry, &game_state.borrow());
        if tick % config.game.full_snapshot_every == 0 {
            broadcast_full_snapshot(&mut engine.borrow_mut().registry, &game_state.borrow());
        }

        tick += 1;
        sleep_until_deadline(&mut deadline, tick_period, &log);
    }
    slog::info!(log, "simulation shutting down");
}

/// Spec §4.8 step 1: drains lifecycle kinds unconditionally, then packet
/// kinds under a combined "≤50 packets OR ≤10ms" budget, dispatching each
/// through the packet `Dispatcher`. Leftover packets stay queued past the
/// budget — no ack is promised; clients recover on the next full snapshot.
fn drain_inbound(event_bus: &mut IoEventBus, dispatcher: &mut Dispatcher<GameCtx>, ctx: &mut GameCtx) {
    event_bus.process_kind(0);
    event_bus.process_kind(1);

    let deadline = Instant::now() + Duration::from_millis(constants::INBOUND_BUDGET_MS);
    let mut dispatched = 0usize;
    loop {
        if dispatched >= constants::INBOUND_BUDGET_PACKETS || Instant::now() >= deadline {
            break;
        }
        let event = match event_bus.try_recv(TCP_PACKET_KIND).or_else(|| event_bus.try_recv(UDP_DATAGRAM_KIND)) {
            Some(event) => event,
            None => break,
        };
        match event {
            IoEvent::TcpPacket(id, packet) => dispatcher.dispatch(&packet, Origin::Tcp(id), ctx),
            IoEvent::UdpDatagram(id, body) => {
                if let Ok(packet) = rtype_protocol::codec::Packet::from_datagram(&body) {
                    dispatcher.dispatch(&packet, Origin::Udp(id), ctx);
                }
            }
            _ => {}
        }
        dispatched += 1;
    }
}

/// Spec §4.8 step 4: broadcasts deltas for every dirty Player/Projectile/
/// Enemy entity, clearing each flag as it's packed, capped per UDP packet at
/// `floor(1400/sizeof(Update))` entries.
fn broadcast_dirty_deltas(registry: &mut rtype_ecs::Registry, state: &state::GameState) {
    let players = collect_dirty_players(registry);
    pack_and_broadcast(state, PacketType::UpdatePlayer, players);

    let projectiles = collect_dirty_projectiles(registry);
    pack_and_broadcast(state, PacketType::UpdateProjectile, projectiles);

    let enemies = collect_dirty_enemies(registry);
    pack_and_broadcast(state, PacketType::UpdateEnemy, enemies);
}

/// Spec §4.8 step 5: the unconditional full snapshot, ignoring `DirtyFlag`.
fn broadcast_full_snapshot(registry: &mut rtype_ecs::Registry, state: &state::GameState) {
    let players = collect_all_players(registry);
    pack_and_broadcast(state, PacketType::UpdatePlayer, players);

    let projectiles = collect_all_projectiles(registry);
    pack_and_broadcast(state, PacketType::UpdateProjectile, projectiles);

    let enemies = collect_all_enemies(registry);
    pack_and_broadcast(state, PacketType::UpdateEnemy, enemies);
}

fn collect_dirty_players(registry: &mut rtype_ecs::Registry) -> Vec<UpdatePlayer> {
    use gamecore::components::{DirtyFlag, Health, Player, Position};
    let mut out = Vec::new();
    let mut zipper = registry.get_filtered_zipper::<(Player, Position, Health, DirtyFlag)>();
    while let Some((_entity, (player, position, health, dirty))) = zipper.next() {
        if dirty.0 {
            out.push(UpdatePlayer {
                player_id: player.id,
                x: position.x,
                y: position.y,
                score: player.score,
                health: health.0.max(0).min(255) as u8,
            });
            dirty.0 = false;
        }
    }
    out
}

fn collect_all_players(registry: &mut rtype_ecs::Registry) -> Vec<UpdatePlayer> {
    use gamecore::components::{Health, Player, Position};
    let mut out = Vec::new();
    let mut zipper = registry.get_filtered_zipper::<(Player, Position, Health)>();
    while let Some((_entity, (player, position, health))) = zipper.next() {
        out.push(UpdatePlayer {
            player_id: player.id,
            x: position.x,
            y: position.y,
            score: player.score,
            health: health.0.max(0).min(255) as u8,
        });
    }
    out
}

fn collect_dirty_projectiles(registry: &mut rtype_ecs::Registry) -> Vec<UpdateProjectile> {
    use gamecore::components::{DirtyFlag, Position, Projectile};
    let mut out = Vec::new();
    let mut zipper = registry.get_filtered_zipper::<(Projectile, Position, DirtyFlag)>();
    while let Some((_entity, (projectile, position, dirty))) = zipper.next() {
        if dirty.0 {
            out.push(UpdateProjectile {
                projectile_id: projectile.id,
                owner_id: projectile.owner_id,
                x: position.x,
                y: position.y,
            });
            dirty.0 = false;
        }
    }
    out
}

fn collect_all_projectiles(registry: &mut rtype_ecs::Registry) -> Vec<UpdateProjectile> {
    use gamecore::components::{Position, Projectile};
    let mut out = Vec::new();
    let mut zipper = registry.get_filtered_zipper::<(Projectile, Position)>();
    while let Some((_entity, (projectile, position))) = zipper.next() {
        out.push(UpdateProjectile { projectile_id: projectile.id, owner_id: projectile.owner_id, x: position.x, y: position.y });
    }
    out
}

fn collect_dirty_enemies(registry: &mut rtype_ecs::Registry) -> Vec<UpdateEnemy> {
    use gamecore::components::{DirtyFlag, Enemy, Position};
    let mut out = Vec::new();
    let mut zipper = registry.get_filtered_zipper::<(Enemy, Position, DirtyFlag)>();
    while let Some((_entity, (enemy, position, dirty))) = zipper.next() {
        if dirty.0 {
            out.push(UpdateEnemy { enemy_id: enemy.id, x: position.x, y: position.y });
            dirty.0 = false;
        }
    }
    out
}

fn collect_all_enemies(registry: &mut rtype_ecs::Registry) -> Vec<UpdateEnemy> {
    use gamecore::components::{Enemy, Position};
    let mut out = Vec::new();
    let mut zipper = registry.get_filtered_zipper::<(Enemy, Position)>();
    while let Some((_entity, (enemy, position))) = zipper.next() {
        out.push(UpdateEnemy { enemy_id: enemy.id, x: position.x, y: position.y });
    }
    out
}

fn pack_and_broadcast<T: rtype_protocol::codec::Encode + FixedSize>(
    state: &state::GameState,
    kind: PacketType,
    items: Vec<T>,
) {
    if items.is_empty() {
        return;
    }
    let entries_per_packet = (UDP_DELTA_BUDGET_BYTES / T::SIZE).max(1);
    for chunk in items.chunks(entries_per_packet) {
        let packet = create_packet_array(kind, chunk);
        state.outbound().broadcast_udp(packet.to_bytes());
    }
}

/// Spec §4.8 step 6: sleeps until `deadline`; on overrun, logs and restarts
/// the deadline from "now" rather than trying to catch up.
fn sleep_until_deadline(deadline: &mut Instant, period: Duration, log: &Logger) {
    let now = Instant::now();
    if *deadline > now {
        thread::sleep(*deadline - now);
        *deadline += period;
    } else {
        let overrun = now - *deadline;
        slog::warn!(log, "tick overran its deadline"; "overrun_ms" => overrun.as_millis() as u64);
        *deadline = now + period;
    }
}
