//! Sample host model: a miniature game server with worlds and players.
//!
//! Exercises the three host surfaces — type schemas, domain codecs, and a
//! caller-relative decoder (`me` resolves against the requesting principal).

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

use spyglass_core::{
    Caller, CodecCtx, Decode, DecodeError, Encode, Engine, HostObject, MethodDesc, RegistryError,
    TypeKey, TypeSchema, TypeShape, Value, keys,
};

// ─── Keys ─────────────────────────────────────────────────────────────────────

pub const SERVER: TypeKey = TypeKey("server");
pub const WORLD: TypeKey = TypeKey("world");
pub const PLAYER: TypeKey = TypeKey("player");
pub const POSITION: TypeKey = TypeKey("position");
pub const DIFFICULTY: TypeKey = TypeKey("difficulty");
pub const WEATHER: TypeKey = TypeKey("weather");

// ─── Objects ──────────────────────────────────────────────────────────────────

pub struct Server {
    motd: String,
    worlds: Vec<Arc<World>>,
}

pub struct World {
    name: String,
    time: AtomicI64,
    difficulty: Mutex<&'static str>,
    weather: Mutex<&'static str>,
    spawn: Position,
    players: Vec<Arc<Player>>,
}

pub struct Player {
    name: String,
    health: Mutex<f64>,
    position: Position,
}

#[derive(Clone, Copy)]
pub struct Position {
    x: f64,
    y: f64,
    z: f64,
}

impl HostObject for Server {
    fn type_key(&self) -> TypeKey {
        SERVER
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl HostObject for World {
    fn type_key(&self) -> TypeKey {
        WORLD
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl HostObject for Player {
    fn type_key(&self) -> TypeKey {
        PLAYER
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl HostObject for Position {
    fn type_key(&self) -> TypeKey {
        POSITION
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Principal supplied on the command line via `--as`.
pub struct CliCaller(pub String);

impl Caller for CliCaller {
    fn name(&self) -> &str {
        &self.0
    }
}

// ─── Schemas ──────────────────────────────────────────────────────────────────

fn enum_schema(key: TypeKey, variants: &[&'static str]) -> TypeSchema {
    TypeSchema {
        key,
        parent: Some(keys::ENUM),
        interfaces: vec![],
        shape: TypeShape::Enum { variants: variants.to_vec() },
        methods: vec![],
    }
}

fn server_schema() -> TypeSchema {
    TypeSchema {
        key: SERVER,
        parent: None,
        interfaces: vec![],
        shape: TypeShape::Scalar,
        methods: vec![
            MethodDesc {
                name: "getMotd",
                params: vec![],
                call: |recv, _args| {
                    let s = recv.receiver::<Server>("server")?;
                    Ok(Value::Str(s.motd.clone()))
                },
            },
            MethodDesc {
                name: "getWorlds",
                params: vec![],
                call: |recv, _args| {
                    let s = recv.receiver::<Server>("server")?;
                    Ok(Value::Seq(
                        s.worlds.iter().map(|w| Value::Object(w.clone())).collect(),
                    ))
                },
            },
            MethodDesc {
                name: "getWorld",
                params: vec![keys::STRING],
                call: |recv, args| {
                    let s = recv.receiver::<Server>("server")?;
                    let Value::Str(name) = &args[0] else { unreachable!() };
                    Ok(s.worlds
                        .iter()
                        .find(|w| &w.name == name)
                        .map(|w| Value::Object(w.clone()))
                        .unwrap_or(Value::Null))
                },
            },
            MethodDesc {
                name: "getOnlineCount",
                params: vec![],
                call: |recv, _args| {
                    let s = recv.receiver::<Server>("server")?;
                    let count: usize = s.worlds.iter().map(|w| w.players.len()).sum();
                    Ok(Value::I32(count as i32))
                },
            },
        ],
    }
}

fn world_schema() -> TypeSchema {
    TypeSchema {
        key: WORLD,
        parent: None,
        interfaces: vec![],
        shape: TypeShape::Scalar,
        methods: vec![
            MethodDesc {
                name: "getName",
                params: vec![],
                call: |recv, _args| {
                    let w = recv.receiver::<World>("world")?;
                    Ok(Value::Str(w.name.clone()))
                },
            },
            MethodDesc {
                name: "getTime",
                params: vec![],
                call: |recv, _args| {
                    let w = recv.receiver::<World>("world")?;
                    Ok(Value::I64(w.time.load(Ordering::Relaxed)))
                },
            },
            MethodDesc {
                name: "setTime",
                params: vec![keys::I64],
                call: |recv, args| {
                    let w = recv.receiver::<World>("world")?;
                    let Value::I64(t) = &args[0] else { unreachable!() };
                    w.time.store(*t, Ordering::Relaxed);
                    Ok(Value::Null)
                },
            },
            MethodDesc {
                name: "getDifficulty",
                params: vec![],
                call: |recv, _args| {
                    let w = recv.receiver::<World>("world")?;
                    Ok(Value::Enum { ty: DIFFICULTY, variant: *w.difficulty.lock() })
                },
            },
            MethodDesc {
                name: "setDifficulty",
                params: vec![DIFFICULTY],
                call: |recv, args| {
                    let w = recv.receiver::<World>("world")?;
                    let Value::Enum { variant, .. } = &args[0] else { unreachable!() };
                    *w.difficulty.lock() = *variant;
                    Ok(Value::Null)
                },
            },
            MethodDesc {
                name: "getWeather",
                params: vec![],
                call: |recv, _args| {
                    let w = recv.receiver::<World>("world")?;
                    Ok(Value::Enum { ty: WEATHER, variant: *w.weather.lock() })
                },
            },
            MethodDesc {
                name: "setWeather",
                params: vec![WEATHER],
                call: |recv, args| {
                    let w = recv.receiver::<World>("world")?;
                    let Value::Enum { variant, .. } = &args[0] else { unreachable!() };
                    *w.weather.lock() = *variant;
                    Ok(Value::Null)
                },
            },
            MethodDesc {
                name: "getSpawn",
                params: vec![],
                call: |recv, _args| {
                    let w = recv.receiver::<World>("world")?;
                    Ok(Value::object(w.spawn))
                },
            },
            MethodDesc {
                name: "getPlayers",
                params: vec![],
                call: |recv, _args| {
                    let w = recv.receiver::<World>("world")?;
                    Ok(Value::Seq(
                        w.players.iter().map(|p| Value::Object(p.clone())).collect(),
                    ))
                },
            },
            MethodDesc {
                name: "getPlayer",
                params: vec![keys::STRING],
                call: |recv, args| {
                    let w = recv.receiver::<World>("world")?;
                    let Value::Str(name) = &args[0] else { unreachable!() };
                    Ok(w.players
                        .iter()
                        .find(|p| &p.name == name)
                        .map(|p| Value::Object(p.clone()))
                        .unwrap_or(Value::Null))
                },
            },
        ],
    }
}

fn player_schema() -> TypeSchema {
    TypeSchema {
        key: PLAYER,
        parent: None,
        interfaces: vec![],
        shape: TypeShape::Scalar,
        methods: vec![
            MethodDesc {
                name: "getName",
                params: vec![],
                call: |recv, _args| {
                    let p = recv.receiver::<Player>("player")?;
                    Ok(Value::Str(p.name.clone()))
                },
            },
            MethodDesc {
                name: "getHealth",
                params: vec![],
                call: |recv, _args| {
                    let p = recv.receiver::<Player>("player")?;
                    Ok(Value::F64(*p.health.lock()))
                },
            },
            MethodDesc {
                name: "heal",
                params: vec![keys::F64],
                call: |recv, args| {
                    let p = recv.receiver::<Player>("player")?;
                    let Value::F64(amount) = &args[0] else { unreachable!() };
                    let mut health = p.health.lock();
                    *health = (*health + amount).min(20.0);
                    Ok(Value::F64(*health))
                },
            },
            MethodDesc {
                name: "getPosition",
                params: vec![],
                call: |recv, _args| {
                    let p = recv.receiver::<Player>("player")?;
                    Ok(Value::object(p.position))
                },
            },
        ],
    }
}

fn position_schema() -> TypeSchema {
    TypeSchema {
        key: POSITION,
        parent: None,
        interfaces: vec![],
        shape: TypeShape::Scalar,
        methods: vec![
            MethodDesc {
                name: "getX",
                params: vec![],
                call: |recv, _args| {
                    let p = recv.receiver::<Position>("position")?;
                    Ok(Value::F64(p.x))
                },
            },
            MethodDesc {
                name: "getY",
                params: vec![],
                call: |recv, _args| {
                    let p = recv.receiver::<Position>("position")?;
                    Ok(Value::F64(p.y))
                },
            },
            MethodDesc {
                name: "getZ",
                params: vec![],
                call: |recv, _args| {
                    let p = recv.receiver::<Position>("position")?;
                    Ok(Value::F64(p.z))
                },
            },
            MethodDesc {
                name: "distance",
                params: vec![POSITION],
                call: |recv, args| {
                    let a = recv.receiver::<Position>("position")?;
                    let Some(b) = args[0].downcast::<Position>() else { unreachable!() };
                    let (dx, dy, dz) = (a.x - b.x, a.y - b.y, a.z - b.z);
                    Ok(Value::F64((dx * dx + dy * dy + dz * dz).sqrt()))
                },
            },
        ],
    }
}

// ─── Decoders ─────────────────────────────────────────────────────────────────

/// Resolves a world by name.
struct WorldDecoder {
    server: Arc<Server>,
}

impl Decode for WorldDecoder {
    fn relevant_type(&self) -> TypeKey {
        WORLD
    }

    fn decode(
        &self,
        target: TypeKey,
        token: &str,
        _ctx: &CodecCtx<'_>,
    ) -> Result<Value, DecodeError> {
        self.server
            .worlds
            .iter()
            .find(|w| w.name == token)
            .map(|w| Value::Object(w.clone()))
            .ok_or_else(|| {
                let known: Vec<&str> = self.server.worlds.iter().map(|w| w.name.as_str()).collect();
                DecodeError::new(target, token, format!("unknown world (known: {})", known.join(", ")))
            })
    }
}

/// Resolves a player by name; `me` resolves against the requesting principal.
struct PlayerDecoder {
    server: Arc<Server>,
}

impl Decode for PlayerDecoder {
    fn relevant_type(&self) -> TypeKey {
        PLAYER
    }

    fn decode(
        &self,
        target: TypeKey,
        token: &str,
        ctx: &CodecCtx<'_>,
    ) -> Result<Value, DecodeError> {
        let wanted = if token == "me" {
            match ctx.caller {
                Some(caller) => caller.name().to_string(),
                None => {
                    return Err(DecodeError::new(target, token, "no caller to resolve `me` against"));
                }
            }
        } else {
            token.to_string()
        };
        self.server
            .worlds
            .iter()
            .flat_map(|w| w.players.iter())
            .find(|p| p.name == wanted)
            .map(|p| Value::Object(p.clone()))
            .ok_or_else(|| DecodeError::new(target, token, format!("no online player named `{wanted}`")))
    }
}

/// `x,y,z` — exactly three numeric components.
struct PositionDecoder;

impl Decode for PositionDecoder {
    fn relevant_type(&self) -> TypeKey {
        POSITION
    }

    fn decode(
        &self,
        target: TypeKey,
        token: &str,
        _ctx: &CodecCtx<'_>,
    ) -> Result<Value, DecodeError> {
        let parts: Vec<&str> = token.split(',').collect();
        if parts.len() != 3 {
            return Err(DecodeError::new(target, token, "expected exactly 3 comma-separated components"));
        }
        let mut xyz = [0.0f64; 3];
        for (slot, piece) in xyz.iter_mut().zip(&parts) {
            *slot = piece
                .trim()
                .parse::<f64>()
                .map_err(|_| DecodeError::new(target, token, format!("malformed component `{piece}`")))?;
        }
        Ok(Value::object(Position { x: xyz[0], y: xyz[1], z: xyz[2] }))
    }
}

// ─── Encoders ─────────────────────────────────────────────────────────────────

struct WorldEncoder;

impl Encode for WorldEncoder {
    fn relevant_type(&self) -> TypeKey {
        WORLD
    }

    fn encode(&self, value: &Value, _ctx: &CodecCtx<'_>) -> Option<String> {
        let w = value.downcast::<World>()?;
        Some(format!(
            "{}[time={} difficulty={} weather={}]",
            w.name,
            w.time.load(Ordering::Relaxed),
            *w.difficulty.lock(),
            *w.weather.lock(),
        ))
    }
}

struct PlayerEncoder;

impl Encode for PlayerEncoder {
    fn relevant_type(&self) -> TypeKey {
        PLAYER
    }

    fn encode(&self, value: &Value, _ctx: &CodecCtx<'_>) -> Option<String> {
        let p = value.downcast::<Player>()?;
        Some(format!("{} ({:.1} hp)", p.name, *p.health.lock()))
    }
}

struct PositionEncoder;

impl Encode for PositionEncoder {
    fn relevant_type(&self) -> TypeKey {
        POSITION
    }

    fn encode(&self, value: &Value, _ctx: &CodecCtx<'_>) -> Option<String> {
        let p = value.downcast::<Position>()?;
        Some(format!("({:.1}, {:.1}, {:.1})", p.x, p.y, p.z))
    }
}

// ─── Bootstrap ────────────────────────────────────────────────────────────────

/// Register the sample model and return the live server it decodes against.
pub fn install(engine: &mut Engine) -> Result<Arc<Server>, RegistryError> {
    engine.register_type(enum_schema(DIFFICULTY, &["PEACEFUL", "EASY", "NORMAL", "HARD"]))?;
    engine.register_type(enum_schema(WEATHER, &["CLEAR", "RAIN", "THUNDER"]))?;
    engine.register_type(position_schema())?;
    engine.register_type(player_schema())?;
    engine.register_type(world_schema())?;
    engine.register_type(server_schema())?;

    let server = sample_server();
    engine.register_decoder(Box::new(WorldDecoder { server: server.clone() }))?;
    engine.register_decoder(Box::new(PlayerDecoder { server: server.clone() }))?;
    engine.register_decoder(Box::new(PositionDecoder))?;
    engine.register_encoder(Box::new(WorldEncoder))?;
    engine.register_encoder(Box::new(PlayerEncoder))?;
    engine.register_encoder(Box::new(PositionEncoder))?;
    Ok(server)
}

/// Resolve the chain's starting object: `server`, `world:<name>`, or
/// `player:<name>`.
pub fn root_value(server: &Arc<Server>, root: &str) -> Option<Value> {
    if root == "server" {
        return Some(Value::Object(server.clone()));
    }
    if let Some(name) = root.strip_prefix("world:") {
        return server.worlds.iter().find(|w| w.name == name).map(|w| Value::Object(w.clone()));
    }
    if let Some(name) = root.strip_prefix("player:") {
        return server
            .worlds
            .iter()
            .flat_map(|w| w.players.iter())
            .find(|p| p.name == name)
            .map(|p| Value::Object(p.clone()));
    }
    None
}

fn sample_server() -> Arc<Server> {
    let steve = Arc::new(Player {
        name: "Steve".into(),
        health: Mutex::new(20.0),
        position: Position { x: 12.0, y: 64.0, z: -3.0 },
    });
    let alex = Arc::new(Player {
        name: "Alex".into(),
        health: Mutex::new(17.5),
        position: Position { x: -8.0, y: 70.0, z: 44.0 },
    });
    let overworld = Arc::new(World {
        name: "overworld".into(),
        time: AtomicI64::new(1000),
        difficulty: Mutex::new("NORMAL"),
        weather: Mutex::new("CLEAR"),
        spawn: Position { x: 0.0, y: 64.0, z: 0.0 },
        players: vec![steve, alex],
    });
    let nether = Arc::new(World {
        name: "the_nether".into(),
        time: AtomicI64::new(18000),
        difficulty: Mutex::new("HARD"),
        weather: Mutex::new("CLEAR"),
        spawn: Position { x: 0.0, y: 32.0, z: 0.0 },
        players: vec![],
    });
    Arc::new(Server { motd: "A spyglass test server".into(), worlds: vec![overworld, nether] })
}
