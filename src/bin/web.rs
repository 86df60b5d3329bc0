//! Single binary web server: page routes resolve the tournament selection, API via REST.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default so the site is reachable via DNS on a VPS.
//! Override with env: HOST, PORT, SEASON_MAP_PATH, SELECTION_DATA_DIR, SELECTION_TTL_HOURS,
//! SESSION_KEY.

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::{
    cookie::Key,
    get,
    http::header,
    post,
    web::{self, Data, Json},
    App, HttpRequest, HttpResponse, HttpResponseBuilder, HttpServer,
};
use league_site::{
    CookieStore, CssVariables, FileSeasonMapService, JsonFileStore, PersistenceSink,
    RecordingNavigator, SeasonMapResolver, SeasonMapState, SelectionStateMachine, SelectionView,
    SeasonMap, SiteConfig, Stage, TournamentCatalog, TournamentDescriptor, STAGE_KEY,
    TOURNAMENT_KEY,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Shared server state: catalog plus the process-wide season map snapshot.
struct SiteState {
    config: SiteConfig,
    catalog: Arc<TournamentCatalog>,
    season_map: RwLock<SeasonMapState>,
}

type AppState = Data<SiteState>;

/// One machine per request; its navigator reports the request URL and records pushes.
type Machine = SelectionStateMachine<RecordingNavigator, CssVariables>;

/// Session key holding the browser id that names the durable selection file.
const BROWSER_ID_KEY: &str = "browser_id";

const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Serialize)]
struct SelectionResponse {
    /// URL the client should push (scroll preserved), if the selection moved it.
    navigate: Option<String>,
    selection: SelectionView,
    theme: CssVariables,
}

#[derive(Serialize)]
struct SeasonMapResponse<'a> {
    state: &'static str,
    entries: Option<&'a SeasonMap>,
}

#[derive(Deserialize)]
struct SetTournamentBody {
    /// Current client URL (`/path?query`).
    location: String,
    tournament: String,
}

#[derive(Deserialize)]
struct SetStageBody {
    location: String,
    stage: Stage,
}

#[derive(Deserialize)]
struct SetSeasonBody {
    location: String,
    season: u32,
}

#[derive(Deserialize)]
struct SetRoundBody {
    location: String,
    round: u32,
}

/// Request-scoped machine plus the cookie backend it writes through.
struct RequestContext {
    machine: Machine,
    cookies: CookieStore,
}

fn browser_id(session: &Session) -> Uuid {
    match session.get::<Uuid>(BROWSER_ID_KEY) {
        Ok(Some(id)) => id,
        Ok(None) | Err(_) => {
            let id = Uuid::new_v4();
            if let Err(e) = session.insert(BROWSER_ID_KEY, id) {
                log::warn!("could not store browser id in session: {}", e);
            }
            id
        }
    }
}

/// Build and mount the machine for this request: cookies from the request, durable store
/// from the browser's file, season map snapshot if the fetch has settled.
fn open_context(req: &HttpRequest, state: &SiteState, session: &Session, url: &str) -> RequestContext {
    let cookies = CookieStore::new();
    for key in [TOURNAMENT_KEY, STAGE_KEY] {
        if let Some(cookie) = req.cookie(key) {
            cookies.load(key, cookie.value());
        }
    }
    let durable = JsonFileStore::for_browser(&state.config.data_dir, browser_id(session));
    let persistence = PersistenceSink::new(durable, cookies.clone());
    let mut machine = SelectionStateMachine::new(
        Arc::clone(&state.catalog),
        persistence,
        RecordingNavigator::new(url),
        CssVariables::default(),
    );
    match state.season_map.read() {
        Ok(map_state) => machine.apply_season_map(&map_state),
        Err(_) => log::error!("season map lock poisoned"),
    }
    machine.mount();
    RequestContext { machine, cookies }
}

fn add_cookies(res: &mut HttpResponseBuilder, cookies: &CookieStore) {
    for cookie in cookies.delta() {
        res.cookie(cookie);
    }
}

fn selection_response(ctx: RequestContext) -> HttpResponse {
    let mut res = HttpResponse::Ok();
    add_cookies(&mut res, &ctx.cookies);
    res.json(SelectionResponse {
        navigate: ctx.machine.navigator().last_push().map(str::to_string),
        selection: ctx.machine.view(),
        theme: ctx.machine.theme().clone(),
    })
}

fn request_url(req: &HttpRequest) -> String {
    match req.query_string() {
        "" => req.path().to_string(),
        query => format!("{}?{}", req.path(), query),
    }
}

#[get("/api/health")]
async fn api_health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "league-site",
    })
}

/// Avoid 404 in browser tab: favicon not required for app logic.
#[get("/favicon.ico")]
async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// Tournaments in display order (season map `sort_order` once loaded).
#[get("/api/tournaments")]
async fn api_tournaments(state: AppState) -> HttpResponse {
    let map_state = match state.season_map.read() {
        Ok(guard) => guard.clone(),
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let map = match &map_state {
        SeasonMapState::Loaded(map) => Some(map.as_ref()),
        _ => None,
    };
    let list: Vec<&TournamentDescriptor> = state.catalog.ordered(map);
    HttpResponse::Ok().json(list)
}

#[get("/api/season-map")]
async fn api_season_map(state: AppState) -> HttpResponse {
    let map_state = match state.season_map.read() {
        Ok(guard) => guard.clone(),
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let body = match &map_state {
        SeasonMapState::Pending => SeasonMapResponse {
            state: "pending",
            entries: None,
        },
        SeasonMapState::Loaded(map) => SeasonMapResponse {
            state: "loaded",
            entries: Some(map.as_ref()),
        },
        SeasonMapState::Unavailable => SeasonMapResponse {
            state: "unavailable",
            entries: None,
        },
    };
    HttpResponse::Ok().json(body)
}

/// Switch tournament. Unknown ids are logged and leave the selection as it was.
#[post("/api/selection/tournament")]
async fn api_set_tournament(
    req: HttpRequest,
    state: AppState,
    session: Session,
    body: Json<SetTournamentBody>,
) -> HttpResponse {
    let mut ctx = open_context(&req, &state, &session, &body.location);
    if let Err(e) = ctx.machine.set_tournament(&body.tournament) {
        log::warn!("{}", e);
    }
    selection_response(ctx)
}

#[post("/api/selection/stage")]
async fn api_set_stage(
    req: HttpRequest,
    state: AppState,
    session: Session,
    body: Json<SetStageBody>,
) -> HttpResponse {
    let mut ctx = open_context(&req, &state, &session, &body.location);
    ctx.machine.set_second_league_stage(body.stage);
    selection_response(ctx)
}

#[post("/api/selection/season")]
async fn api_set_season(
    req: HttpRequest,
    state: AppState,
    session: Session,
    body: Json<SetSeasonBody>,
) -> HttpResponse {
    let mut ctx = open_context(&req, &state, &session, &body.location);
    ctx.machine.set_season(body.season);
    selection_response(ctx)
}

#[post("/api/selection/round")]
async fn api_set_round(
    req: HttpRequest,
    state: AppState,
    session: Session,
    body: Json<SetRoundBody>,
) -> HttpResponse {
    let mut ctx = open_context(&req, &state, &session, &body.location);
    ctx.machine.set_round(body.round);
    selection_response(ctx)
}

/// Any other path is a page. If resolving the selection rewrites the URL, redirect there;
/// otherwise return the resolved selection for the page's data fetches.
async fn page(req: HttpRequest, state: AppState, session: Session) -> HttpResponse {
    let url = request_url(&req);
    let ctx = open_context(&req, &state, &session, &url);
    let redirect = ctx.machine.navigator().last_push().map(str::to_string);
    match redirect {
        Some(target) => {
            log::debug!("{} -> {}", url, target);
            let mut res = HttpResponse::SeeOther();
            res.insert_header((header::LOCATION, target));
            add_cookies(&mut res, &ctx.cookies);
            res.finish()
        }
        None => selection_response(ctx),
    }
}

fn session_key(config: &SiteConfig) -> Key {
    match config.session_key.as_deref().map(|raw| Key::try_from(raw.as_bytes())) {
        Some(Ok(key)) => key,
        Some(Err(e)) => {
            log::warn!("SESSION_KEY rejected ({}), using a generated key", e);
            Key::generate()
        }
        None => Key::generate(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = SiteConfig::from_env();
    let catalog = TournamentCatalog::builtin()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    log::info!("Loaded {} tournaments", catalog.len());
    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let key = session_key(&config);
    let service = FileSeasonMapService::new(&config.season_map_path);
    let state = Data::new(SiteState {
        config,
        catalog: Arc::new(catalog),
        season_map: RwLock::new(SeasonMapState::Pending),
    });

    // Season map: fetched once per process, never refetched; failure keeps fallbacks.
    let mut resolver = SeasonMapResolver::spawn(&service);
    let state_fetch = state.clone();
    actix_web::rt::spawn(async move {
        let settled = resolver.settled().await.clone();
        match state_fetch.season_map.write() {
            Ok(mut guard) => *guard = settled,
            Err(_) => log::error!("season map lock poisoned"),
        }
    });

    // Background task: every 30 minutes, delete selection files nobody has touched in a while
    let data_dir = state.config.data_dir.clone();
    let max_age = chrono::Duration::hours(state.config.selection_ttl_hours);
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = JsonFileStore::sweep_stale(&data_dir, max_age, chrono::Utc::now());
            if removed > 0 {
                log::info!("Cleaned up {} stale selection file(s)", removed);
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                key.clone(),
            ))
            .app_data(state.clone())
            .service(api_health)
            .service(favicon)
            .service(api_tournaments)
            .service(api_season_map)
            .service(api_set_tournament)
            .service(api_set_stage)
            .service(api_set_season)
            .service(api_set_round)
            .default_service(web::to(page))
    })
    .bind(bind)?
    .run()
    .await
}
