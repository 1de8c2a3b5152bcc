use std::env;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};

use rs_markov_core::model::chain::Chain;
use serde::{Deserialize, Serialize};

/// Server configuration, loaded from a TOML file.
///
/// Every field has a default, so a partial (or missing) file is fine.
#[derive(Deserialize, Clone)]
#[serde(default)]
struct Config {
	/// Address and port to bind.
	bind: String,
	/// Context window length for the chain.
	prefix_len: usize,
	/// Optional corpus file (one corpus unit per line) ingested on startup
	/// and on `/v1/rebuild`.
	corpus: Option<String>,
	/// Canned reply when no context matches the trigger text.
	fallback: String,
	/// Default word budget per generation direction.
	max_words: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			bind: "127.0.0.1:5000".to_owned(),
			prefix_len: 3,
			corpus: None,
			fallback: "What?".to_owned(),
			max_words: 100,
		}
	}
}

impl Config {
	fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
		let contents = std::fs::read_to_string(path)?;
		Ok(toml::from_str(&contents)?)
	}
}

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	n: Option<usize>,
}

/// Struct representing query parameters for the `/v1/reply` endpoint
#[derive(Deserialize)]
struct ReplyParams {
	text: String,
	n: Option<usize>,
}

#[derive(Serialize)]
struct Stats {
	prefix_len: usize,
	contexts: usize,
}

struct SharedData {
	chain: Chain,
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates up to `n` words from a cold start (default: configured
/// `max_words`). An empty body means the chain has no data yet.
#[get("/v1/generate")]
async fn get_generated(
	data: web::Data<Mutex<SharedData>>,
	config: web::Data<Config>,
	query: web::Query<GenerateParams>,
) -> impl Responder {
	let n = query.n.unwrap_or(config.max_words);

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
	};

	HttpResponse::Ok().body(shared_data.chain.generate(n))
}

/// HTTP GET endpoint `/v1/reply`
///
/// Answers the trigger text with a keyword-anchored generation; when no
/// known context matches, answers the configured fallback phrase instead.
#[get("/v1/reply")]
async fn get_reply(
	data: web::Data<Mutex<SharedData>>,
	config: web::Data<Config>,
	query: web::Query<ReplyParams>,
) -> impl Responder {
	let n = query.n.unwrap_or(config.max_words);

	// An empty needle would match every context; treat it as a miss
	let keyword = query.text.trim();
	if keyword.is_empty() {
		return HttpResponse::Ok().body(config.fallback.clone());
	}

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
	};

	let text = shared_data.chain.generate_with_keyword(keyword, n);
	if text.is_empty() {
		return HttpResponse::Ok().body(config.fallback.clone());
	}
	HttpResponse::Ok().body(text)
}

/// HTTP GET endpoint `/v1/stats`
#[get("/v1/stats")]
async fn get_stats(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
	};

	HttpResponse::Ok().json(Stats {
		prefix_len: shared_data.chain.prefix_len(),
		contexts: shared_data.chain.context_count(),
	})
}

/// HTTP PUT endpoint `/v1/learn`
///
/// Feeds the request body into the chain, one corpus unit per line.
/// Blank lines are skipped. Responds with the number of units ingested.
#[put("/v1/learn")]
async fn put_learn(data: web::Data<Mutex<SharedData>>, body: web::Bytes) -> impl Responder {
	let text = String::from_utf8_lossy(&body);

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
	};

	let mut count = 0usize;
	for unit in text.lines() {
		if unit.trim().is_empty() {
			continue;
		}
		shared_data.chain.build(unit);
		count += 1;
	}

	HttpResponse::Ok().body(format!("Learned {count} units"))
}

/// HTTP PUT endpoint `/v1/rebuild`
///
/// Discards the current chain and re-ingests the configured corpus file
/// from scratch (the periodic full re-ingest, made an explicit operation).
#[put("/v1/rebuild")]
async fn put_rebuild(
	data: web::Data<Mutex<SharedData>>,
	config: web::Data<Config>,
) -> impl Responder {
	let Some(corpus) = &config.corpus else {
		return HttpResponse::BadRequest().body("No corpus file configured");
	};

	// Ingest before taking the lock so generation stays available meanwhile
	let chain = match Chain::from_corpus_file(corpus, config.prefix_len) {
		Ok(c) => c,
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to rebuild chain: {e}")),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
	};
	shared_data.chain = chain;

	HttpResponse::Ok().body("Chain rebuilt")
}

/// Main entry point for the server.
///
/// Loads the configuration, optionally ingests the corpus file, wraps the
/// chain in a `Mutex` (the chain itself has no internal locking; the caller
/// serializes access) and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let config_path = env::args().nth(1).unwrap_or_else(|| "rs-markov.toml".to_owned());
	let config = match Config::load(&config_path) {
		Ok(c) => c,
		Err(e) => {
			log::warn!("Could not load {config_path} ({e}), using defaults");
			Config::default()
		}
	};

	let chain = match &config.corpus {
		Some(corpus) => {
			let chain = Chain::from_corpus_file(corpus, config.prefix_len)
				.map_err(|e| std::io::Error::other(e.to_string()))?;
			log::info!("Ingested {corpus}: {} contexts", chain.context_count());
			chain
		}
		None => Chain::new(config.prefix_len).map_err(std::io::Error::other)?,
	};

	let shared_data = web::Data::new(Mutex::new(SharedData { chain }));
	let app_config = web::Data::new(config.clone());

	log::info!("Serving on {}", config.bind);
	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.app_data(app_config.clone())
			.service(get_generated)
			.service(get_reply)
			.service(get_stats)
			.service(put_learn)
			.service(put_rebuild)
	})
		.bind(config.bind)?
		.run()
		.await
}
