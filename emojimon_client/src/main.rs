/**
 * Emojimon Terminal Client - Main Entry Point
 *
 */
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use emojimon_client::chat_room::ChatRoom;
use emojimon_client::client::create_devnet_network;
use emojimon_client::config::ClientConfig;
use emojimon_client::devnet::Devnet;
use emojimon_client::error::ClientError;
use emojimon_client::social::SocialGate;
use emojimon_client::store::lock_store;
use emojimon_client::system_calls::{Engagement, SystemCalls};
use emojimon_common::{Address, PermissionLevel, Position, StatusPreset, TerrainType};
use futures::executor::block_on;
use phf::phf_map;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How often the local world mines when it does not confirm on submit
const BLOCK_TIME: Duration = Duration::from_millis(500);

// Macro to parse typed arguments or print usage and return
macro_rules! parse_args {
    ($parts:expr, $usage:expr, $($name:ident : $ty:ty),+) => {
        let mut iter = $parts.iter();
        $( let $name = match iter.next().and_then(|s| s.parse::<$ty>().ok()) {
            Some(v) => v,
            None => { println!("Usage: {}", $usage); return; }
        }; )+
    };
}

// Perfect-hash map for command dispatch
static COMMAND_MAP: phf::Map<&'static str, fn(&mut GameContext, &[&str])> = phf_map! {
    "spawn"    => cmd_spawn,
    "m"        => cmd_move_by,
    "goto"     => cmd_goto,
    "throw"    => cmd_throw,
    "flee"     => cmd_flee,
    "leave"    => cmd_leave,
    "follow"   => cmd_follow,
    "unfollow" => cmd_unfollow,
    "block"    => cmd_block,
    "unblock"  => cmd_unblock,
    "perm"     => cmd_permission,
    "status"   => cmd_status,
    "whois"    => cmd_whois,
    "chat"     => cmd_chat,
    "map"      => cmd_map,
    "walk"     => cmd_walk,
    "npc"      => cmd_npc,
    "help"     => cmd_help,
};

/// Holds mutable game context for command handlers
struct GameContext {
    calls: SystemCalls,
    social: SocialGate,
    devnet: Arc<Devnet>,
    chat: Option<ChatRoom>,
}

impl GameContext {
    fn me(&self) -> Option<Address> {
        self.calls.network().player
    }

    /// Announce whatever the last move got the player into
    fn after_move(&mut self) {
        match self.calls.engagement() {
            Engagement::Free => {
                self.chat = None;
            }
            Engagement::Encounter { .. } => {
                let (name, emoji) = self
                    .calls
                    .encounter_monster()
                    .map(|m| (m.name(), m.emoji()))
                    .unwrap_or(("MissingNo", "💱"));
                println!("A wild {} {} appears! (throw / flee)", name, emoji);
            }
            Engagement::Chat { peer } => {
                if self.chat.as_ref().is_some_and(|room| room.peer == peer) {
                    return;
                }
                let Some(me) = self.me() else { return };
                match block_on(ChatRoom::open(&self.social, me, peer)) {
                    Ok(room) => {
                        println!("You bumped into {} 🥸", peer);
                        print_room(&room);
                        self.chat = Some(room);
                    }
                    Err(e) => println!("Could not open chat with {}: {}", peer, e),
                }
            }
        }
    }

    /// Address argument, or the current chat peer when omitted
    fn target(&self, parts: &[&str]) -> Option<Address> {
        match parts.first() {
            Some(raw) => raw.parse().ok(),
            None => self.chat.as_ref().map(|room| room.peer),
        }
    }
}

fn print_room(room: &ChatRoom) {
    println!("  status:    {}", if room.status.is_empty() { "-" } else { &room.status });
    println!("  following: {}", room.is_following);
    println!("  blocked:   {}", room.is_blocked);
    if room.can_send() {
        println!("  You can send messages.");
    } else {
        println!("  You can't send messages.");
    }
}

fn report<T>(result: Result<T, ClientError>, success: &str, failure: &str) -> Option<T> {
    match result {
        Ok(value) => {
            println!("{}", success);
            Some(value)
        }
        Err(e) if e.is_precondition() => {
            println!("{}", e);
            None
        }
        Err(e) => {
            println!("{}: {}", failure, e);
            None
        }
    }
}

// Handler implementations
fn cmd_spawn(ctx: &mut GameContext, parts: &[&str]) {
    parse_args!(parts, "spawn <x> <y>", x: i32, y: i32);
    if report(block_on(ctx.calls.spawn(x, y)), "Spawned.", "Failed to spawn").is_some() {
        if let Some(pos) = ctx.calls.player_position() {
            println!("You are at {}", pos);
        }
    }
}

fn cmd_move_by(ctx: &mut GameContext, parts: &[&str]) {
    parse_args!(parts, "m <dx> <dy>", dx: i32, dy: i32);
    match block_on(ctx.calls.move_by(dx, dy)) {
        Ok(Some(_)) => {
            if let Some(pos) = ctx.calls.player_position() {
                println!("Moved to {}", pos);
            }
            ctx.after_move();
        }
        Ok(None) => println!("Spawn first."),
        Err(e) => println!("Failed to move: {}", e),
    }
}

fn cmd_goto(ctx: &mut GameContext, parts: &[&str]) {
    parse_args!(parts, "goto <x> <y>", x: i32, y: i32);
    if report(block_on(ctx.calls.move_to(x, y)), "Moved.", "Failed to move").is_some() {
        ctx.after_move();
    }
}

fn cmd_throw(ctx: &mut GameContext, _parts: &[&str]) {
    println!("Throwing emojiball…");
    match block_on(ctx.calls.throw_ball()) {
        Ok(result) => {
            println!("You {} the monster!", result);
            if result.ends_encounter() {
                println!("The encounter is over.");
            }
        }
        Err(e) => println!("Throw failed: {}", e),
    }
}

fn cmd_flee(ctx: &mut GameContext, _parts: &[&str]) {
    report(block_on(ctx.calls.flee_encounter()), "You ran away!", "Failed to flee");
}

fn cmd_leave(ctx: &mut GameContext, _parts: &[&str]) {
    let result = match ctx.chat.take() {
        Some(room) => block_on(room.leave(&ctx.calls)),
        None => block_on(ctx.calls.leave_chat()),
    };
    report(result, "You leave!", "Failed to leave chat");
}

fn set_follow(ctx: &mut GameContext, parts: &[&str], follow: bool) {
    let Some(target) = ctx.target(parts) else {
        let verb = if follow { "follow" } else { "unfollow" };
        println!("Usage: {} <address> (or run it inside a chat)", verb);
        return;
    };
    if let Some(room) = ctx.chat.as_mut().filter(|room| room.peer == target) {
        if room.is_following == follow {
            println!("Nothing to change.");
            return;
        }
        if report(block_on(room.toggle_follow(&ctx.social)), "Done.", "Failed").is_some() {
            print_room(room);
        }
        return;
    }
    let result = if follow {
        block_on(ctx.social.follow_user(target))
    } else {
        block_on(ctx.social.unfollow_user(target))
    };
    report(result, "Done.", "Failed");
}

fn set_block(ctx: &mut GameContext, parts: &[&str], block: bool) {
    let Some(target) = ctx.target(parts) else {
        let verb = if block { "block" } else { "unblock" };
        println!("Usage: {} <address> (or run it inside a chat)", verb);
        return;
    };
    if let Some(room) = ctx.chat.as_mut().filter(|room| room.peer == target) {
        if room.is_blocked == block {
            println!("Nothing to change.");
            return;
        }
        if report(block_on(room.toggle_block(&ctx.social)), "Done.", "Failed").is_some() {
            print_room(room);
        }
        return;
    }
    let result = if block {
        block_on(ctx.social.block(target))
    } else {
        block_on(ctx.social.unblock(target))
    };
    report(result, "Done.", "Failed");
}

fn cmd_follow(ctx: &mut GameContext, parts: &[&str]) {
    set_follow(ctx, parts, true);
}

fn cmd_unfollow(ctx: &mut GameContext, parts: &[&str]) {
    set_follow(ctx, parts, false);
}

fn cmd_block(ctx: &mut GameContext, parts: &[&str]) {
    set_block(ctx, parts, true);
}

fn cmd_unblock(ctx: &mut GameContext, parts: &[&str]) {
    set_block(ctx, parts, false);
}

fn cmd_permission(ctx: &mut GameContext, parts: &[&str]) {
    parse_args!(parts, "perm <public|follower|following|friend|0-3>", level: PermissionLevel);
    report(
        block_on(ctx.social.set_permission_setting(level)),
        &format!("Permission set to {}.", level),
        "Failed to set permission",
    );
}

fn cmd_status(ctx: &mut GameContext, parts: &[&str]) {
    if parts.is_empty() {
        let presets: Vec<&str> = StatusPreset::ALL.iter().map(|p| p.text()).collect();
        println!("Usage: status <text>   presets: {}", presets.join(", "));
        return;
    }
    let text = parts.join(" ");
    let text = text.parse::<StatusPreset>().map(|p| p.text().to_string()).unwrap_or(text);
    report(block_on(ctx.social.set_metadata(&text)), "Status updated.", "Failed to set status");
}

fn cmd_whois(ctx: &mut GameContext, parts: &[&str]) {
    parse_args!(parts, "whois <address>", who: Address);
    let Some(me) = ctx.me() else {
        println!("No player account configured.");
        return;
    };
    let lookup = async {
        let you_follow = ctx.social.is_following_user(me, who).await?;
        let follows_you = ctx.social.is_following_user(who, me).await?;
        let blocked = ctx.social.is_blocked_user(me, who).await?;
        let level = ctx.social.get_permission_setting(who).await?;
        let can_chat = ctx.social.can_chat_with_player(who).await?;
        let status = ctx.social.get_metadata(who).await?;
        Ok::<_, ClientError>((you_follow, follows_you, blocked, level, can_chat, status))
    };
    match block_on(lookup) {
        Ok((you_follow, follows_you, blocked, level, can_chat, status)) => {
            println!("\n{}", who);
            println!("--------------------------------------------");
            println!("  status:       {}", if status.is_empty() { "-" } else { &status });
            println!("  permission:   {}", level);
            println!("  you follow:   {}", you_follow);
            println!("  follows you:  {}", follows_you);
            println!("  you blocked:  {}", blocked);
            println!("  can chat:     {}", can_chat);
            println!();
        }
        Err(e) => println!("Lookup failed: {}", e),
    }
}

fn cmd_chat(ctx: &mut GameContext, _parts: &[&str]) {
    let Some(room) = ctx.chat.as_mut() else {
        println!("You are not chatting with anyone.");
        return;
    };
    if let Err(e) = block_on(room.refresh_can_chat(&ctx.social)) {
        println!("Could not refresh chat permission: {}", e);
    }
    println!("\nChat with {}", room.peer);
    print_room(room);
    if room.can_send() {
        println!("you send a message");
    }
}

fn cmd_map(ctx: &mut GameContext, _parts: &[&str]) {
    let me = ctx.calls.network().player_entity();
    let store = lock_store(&ctx.calls.network().store);
    let Some(map) = store.map() else {
        println!("Map not loaded yet.");
        return;
    };
    let players = store.players();
    println!();
    for y in 0..map.height as i32 {
        let mut row = String::new();
        for x in 0..map.width as i32 {
            let here = Position::new(x, y);
            let cell = match players.iter().find(|(_, pos)| *pos == here) {
                Some((entity, _)) if Some(*entity) == me => "🤠",
                Some(_) => "🥸",
                None => match map.terrain_at(x, y) {
                    TerrainType::None => "··",
                    terrain => terrain.emoji(),
                },
            };
            row.push_str(cell);
        }
        println!("{}", row);
    }
    println!();
}

fn cmd_walk(ctx: &mut GameContext, _parts: &[&str]) {
    if !ctx.calls.is_spawned() {
        println!("Spawn first.");
        return;
    }
    println!("Walking: arrows or WASD to step, q or Esc to stop.");
    if let Err(e) = terminal::enable_raw_mode() {
        println!("Cannot enter walk mode: {}", e);
        return;
    }
    let result = walk_loop(ctx);
    if let Err(e) = terminal::disable_raw_mode() {
        println!("Failed to restore terminal: {}", e);
    }
    println!();
    if let Err(e) = result {
        println!("Walk mode ended: {}", e);
    }
    ctx.after_move();
}

fn walk_loop(ctx: &mut GameContext) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    loop {
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let (dx, dy) = match key.code {
            KeyCode::Up | KeyCode::Char('w') => (0, -1),
            KeyCode::Down | KeyCode::Char('s') => (0, 1),
            KeyCode::Left | KeyCode::Char('a') => (-1, 0),
            KeyCode::Right | KeyCode::Char('d') => (1, 0),
            KeyCode::Esc | KeyCode::Char('q') => return Ok(()),
            _ => continue,
        };
        match block_on(ctx.calls.move_by(dx, dy)) {
            Ok(Some(_)) => {
                if let Some(pos) = ctx.calls.player_position() {
                    write!(stdout, "\r\nat {}", pos)?;
                }
            }
            Ok(None) => write!(stdout, "\r\nspawn first")?,
            Err(e) => write!(stdout, "\r\n{}", e)?,
        }
        stdout.flush()?;
        if ctx.calls.engagement() != Engagement::Free {
            return Ok(());
        }
    }
}

fn cmd_npc(ctx: &mut GameContext, parts: &[&str]) {
    parse_args!(parts, "npc <x> <y>", x: i32, y: i32);
    let Ok(pos) = ctx.calls.wrap_position(x, y) else {
        println!("Map not loaded yet.");
        return;
    };
    let address = Address(rand::random());
    ctx.devnet.add_player(address, pos);
    println!("{} is standing at {}", address, pos);
}

fn cmd_help(_ctx: &mut GameContext, _parts: &[&str]) {
    println!("Commands:");
    println!("  spawn <x> <y>      enter the world");
    println!("  m <dx> <dy>        step relative to your position");
    println!("  goto <x> <y>       step onto an adjacent cell");
    println!("  walk               move with arrows/WASD");
    println!("  throw | flee       during an encounter");
    println!("  leave              leave the current chat");
    println!("  follow | unfollow | block | unblock [address]");
    println!("  perm <level>       who may chat with you");
    println!("  status <text>      set your status line");
    println!("  whois <address>    social info on a player");
    println!("  chat               show the current chat");
    println!("  map                draw the map");
    println!("  npc <x> <y>        place another player");
    println!("  q                  quit");
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config_path = std::env::args().nth(1);
    let config = match ClientConfig::load(config_path.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let (network, devnet) = match create_devnet_network(&config) {
        Ok(connected) => connected,
        Err(e) => {
            eprintln!("Failed to start local world: {}", e);
            std::process::exit(1);
        }
    };
    println!("Connected to local world as {}", config.player_address);

    if !config.devnet.auto_confirm {
        let miner = devnet.clone();
        std::thread::spawn(move || loop {
            std::thread::sleep(BLOCK_TIME);
            miner.mine();
        });
    }

    let mut ctx = GameContext {
        calls: SystemCalls::new(network.clone()),
        social: SocialGate::new(network, config.tx_options),
        devnet,
        chat: None,
    };
    println!("Type `help` for commands.");

    // Main game loop
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        if std::io::stdout().flush().is_err() {
            break;
        }
        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
        }
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some((command, args)) = parts.split_first() else { continue };
        // Dispatch command
        if let Some(&handler) = COMMAND_MAP.get(*command) {
            handler(&mut ctx, args);
        } else if *command == "q" {
            println!("Exiting...");
            break;
        } else {
            println!("Unknown command");
        }
    }
}
