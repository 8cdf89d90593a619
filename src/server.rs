//! HTTP host for encryption helpers and in-process equality sessions.
//!
//! The host owns one long-lived keypair for `/encrypt` and `/add`. Every `/equality` request runs
//! a complete session with its own fresh keypair; nothing is shared between sessions.

use actix_web::{web, HttpResponse, Responder};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::ProtocolError;
use crate::paillier::cipher::{self, Ciphertext};
use crate::paillier::keys::{Keypair, PublicKey};
use crate::protocol::{Protocol, ProtocolOptions};

/// Largest modulus an `/equality` request may ask for, unless the host's own default is larger.
pub const MAX_SESSION_KEY_SIZE: usize = 4096;

/// State shared by all handlers.
pub struct ServerState {
    pub keypair: Keypair,
    /// Defaults for `/equality` requests that leave fields out.
    pub session_options: ProtocolOptions,
}

/// Public key, big-endian bytes in base64.
#[derive(Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub n: String,
    pub g: String,
}

#[derive(Deserialize)]
pub struct EncryptRequest {
    /// Plaintext as a decimal string.
    pub m: String,
}

#[derive(Deserialize)]
pub struct AddRequest {
    pub c1: String,
    pub c2: String,
}

/// A ciphertext, big-endian bytes in base64.
#[derive(Serialize, Deserialize)]
pub struct CiphertextResponse {
    pub c: String,
}

#[derive(Deserialize)]
pub struct EqualityRequest {
    /// Decimal strings.
    pub a: String,
    pub b: String,
    pub kappa: Option<usize>,
    pub keysize: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct EqualityResponse {
    pub equal: bool,
    /// The session's `curly_theta`, base64.
    pub result: String,
}

/// Register every route on an app or scope.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/public-key", web::get().to(public_key))
        .route("/encrypt", web::post().to(encrypt))
        .route("/add", web::post().to(add))
        .route("/equality", web::post().to(equality));
}

fn encode(value: &BigUint) -> String {
    STANDARD.encode(value.to_bytes_be())
}

fn encode_ciphertext(c: &Ciphertext) -> String {
    STANDARD.encode(c.to_bytes_be())
}

fn decode_ciphertext(pk: &PublicKey, encoded: &str) -> Option<Ciphertext> {
    let bytes = STANDARD.decode(encoded).ok()?;
    Ciphertext::from_raw(pk, BigUint::from_bytes_be(&bytes)).ok()
}

fn parse_decimal(value: &str) -> Option<BigUint> {
    BigUint::parse_bytes(value.as_bytes(), 10)
}

/// GET /public-key
async fn public_key(state: web::Data<ServerState>) -> impl Responder {
    let pk = state.keypair.public();
    HttpResponse::Ok().json(PublicKeyResponse { n: encode(pk.n()), g: encode(pk.g()) })
}

/// POST /encrypt
/// { "m": "<decimal>" }
async fn encrypt(state: web::Data<ServerState>, body: web::Json<EncryptRequest>) -> impl Responder {
    let m = match parse_decimal(&body.m) {
        Some(m) => m,
        None => return HttpResponse::BadRequest().body("Invalid plaintext"),
    };
    match cipher::encrypt(state.keypair.public(), &m) {
        Ok(c) => HttpResponse::Ok().json(CiphertextResponse { c: encode_ciphertext(&c) }),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

/// POST /add
/// { "c1": "<base64>", "c2": "<base64>" }
async fn add(state: web::Data<ServerState>, body: web::Json<AddRequest>) -> impl Responder {
    let pk = state.keypair.public();
    let (c1, c2) = match (decode_ciphertext(pk, &body.c1), decode_ciphertext(pk, &body.c2)) {
        (Some(c1), Some(c2)) => (c1, c2),
        _ => return HttpResponse::BadRequest().body("Invalid ciphertext"),
    };
    let sum = cipher::add(pk, &c1, &c2);
    HttpResponse::Ok().json(CiphertextResponse { c: encode_ciphertext(&sum) })
}

/// POST /equality
/// { "a": "<decimal>", "b": "<decimal>", "kappa": 40, "keysize": 2048 }
async fn equality(state: web::Data<ServerState>, body: web::Json<EqualityRequest>) -> impl Responder {
    let (a, b) = match (parse_decimal(&body.a), parse_decimal(&body.b)) {
        (Some(a), Some(b)) => (a, b),
        _ => return HttpResponse::BadRequest().body("Invalid input"),
    };
    let options = ProtocolOptions {
        kappa: body.kappa.unwrap_or(state.session_options.kappa),
        keysize: body.keysize.unwrap_or(state.session_options.keysize),
    };
    let max_keysize = MAX_SESSION_KEY_SIZE.max(state.session_options.keysize);
    if options.keysize > max_keysize {
        return HttpResponse::BadRequest().body(format!("keysize {} exceeds {max_keysize}", options.keysize));
    }
    let mut protocol = match Protocol::with_options(a, b, options) {
        Ok(protocol) => protocol,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };

    let outcome = web::block(move || -> Result<EqualityResponse, ProtocolError> {
        protocol.start()?;
        let result = protocol.result()?;
        Ok(EqualityResponse { equal: protocol.decrypted_result()?, result: encode_ciphertext(&result) })
    })
    .await;

    match outcome {
        Ok(Ok(response)) => {
            info!(kappa = options.kappa, keysize = options.keysize, "equality session served");
            HttpResponse::Ok().json(response)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "equality session failed");
            HttpResponse::InternalServerError().body(e.to_string())
        }
        Err(e) => {
            warn!(error = %e, "equality session was cancelled");
            HttpResponse::InternalServerError().body("Session cancelled")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;

    fn state() -> web::Data<ServerState> {
        web::Data::new(ServerState {
            keypair: Keypair::generate(256).unwrap(),
            session_options: ProtocolOptions { kappa: 40, keysize: 256 },
        })
    }

    #[actix_web::test]
    async fn encrypt_then_add_decrypts_to_sum() {
        let state = state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let mut encrypted = Vec::new();
        for m in ["20", "22"] {
            let req = test::TestRequest::post().uri("/encrypt").set_json(json!({ "m": m })).to_request();
            let resp: CiphertextResponse = test::call_and_read_body_json(&app, req).await;
            encrypted.push(resp.c);
        }

        let req = test::TestRequest::post()
            .uri("/add")
            .set_json(json!({ "c1": encrypted[0], "c2": encrypted[1] }))
            .to_request();
        let resp: CiphertextResponse = test::call_and_read_body_json(&app, req).await;

        let pk = state.keypair.public();
        let sum = decode_ciphertext(pk, &resp.c).unwrap();
        let opened = cipher::decrypt(pk, state.keypair.secret(), &sum).unwrap();
        assert_eq!(opened, BigUint::from(42u32));
    }

    #[actix_web::test]
    async fn public_key_matches_state() {
        let state = state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;
        let req = test::TestRequest::get().uri("/public-key").to_request();
        let resp: PublicKeyResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.n, encode(state.keypair.public().n()));
    }

    #[actix_web::test]
    async fn equality_sessions() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::post().uri("/equality").set_json(json!({ "a": "42", "b": "42" })).to_request();
        let resp: EqualityResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.equal);

        let req = test::TestRequest::post().uri("/equality").set_json(json!({ "a": "42", "b": "7" })).to_request();
        let resp: EqualityResponse = test::call_and_read_body_json(&app, req).await;
        assert!(!resp.equal);
    }

    #[actix_web::test]
    async fn bad_requests() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::post().uri("/encrypt").set_json(json!({ "m": "forty" })).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/add")
            .set_json(json!({ "c1": "not base64!", "c2": "AQ==" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/equality")
            .set_json(json!({ "a": "1", "b": "1", "kappa": 0 }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/equality")
            .set_json(json!({ "a": "1", "b": "1", "keysize": MAX_SESSION_KEY_SIZE + 2 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("exceeds 4096"));
    }
}
