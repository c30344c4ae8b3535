/*!
 * The routes module contains all the tide routes and the logic to fulfill the responses for each
 * route.
 *
 * Modules are nested for cleaner organization here
 */
use log::*;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tide::{Request, Response, StatusCode};

use crate::validation::FieldErrors;
use crate::vote::VoteError;
use crate::AppState;

/**
 * Read the request body into a JSON value
 *
 * Form encoded bodies are accepted as well, in which case every value is a
 * string. An empty body is an empty object.
 */
async fn payload(req: &mut Request<AppState>) -> Result<Value, Response> {
    let is_form = req
        .content_type()
        .map(|mime| mime.essence() == "application/x-www-form-urlencoded")
        .unwrap_or(false);

    let raw = req.body_string().await.map_err(|err| {
        detail(
            StatusCode::BadRequest,
            format!("Could not read request body - {}", err),
        )
    })?;

    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    if is_form {
        serde_qs::from_str::<BTreeMap<String, String>>(&raw)
            .map(|fields| {
                Value::Object(
                    fields
                        .into_iter()
                        .map(|(k, v)| (k, Value::String(v)))
                        .collect(),
                )
            })
            .map_err(|err| detail(StatusCode::BadRequest, format!("Form parse error - {}", err)))
    } else {
        serde_json::from_str(&raw)
            .map_err(|err| detail(StatusCode::BadRequest, format!("JSON parse error - {}", err)))
    }
}

/**
 * The `:id` path parameter, a malformed id can never name a row
 */
fn id_param(req: &Request<AppState>) -> Option<i64> {
    req.param("id").ok()?.parse().ok()
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> tide::Result {
    Ok(Response::builder(status)
        .body(serde_json::to_value(value)?)
        .build())
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    let message: String = message.into();
    Response::builder(status)
        .body(json!({ "detail": message }))
        .build()
}

fn not_found() -> tide::Result {
    Ok(detail(StatusCode::NotFound, "Not found."))
}

fn invalid(errors: &FieldErrors) -> tide::Result {
    json_response(StatusCode::BadRequest, errors)
}

/**
 * Responses for a vote which could not be cast
 */
fn vote_failed(err: VoteError) -> tide::Result {
    match err {
        VoteError::NotFound(id) => {
            debug!("Vote for missing choice {}", id);
            Ok(Response::new(StatusCode::NotFound))
        }
        VoteError::Invalid(errors) => invalid(&errors),
        VoteError::Store(err) => {
            error!("Failed to cast vote: {}", err);
            Err(err.into())
        }
    }
}

macro_rules! read_payload {
    ($req:expr) => {
        match payload(&mut $req).await {
            Ok(value) => value,
            Err(response) => return Ok(response),
        }
    };
}

/**
 *  GET /
 */
pub async fn index(req: Request<AppState>) -> tide::Result {
    let polls = req.state().store.list_polls().await?;
    let page = crate::api_models::IndexPage::from(polls);
    let html = req.state().templates.render("index", &page)?;

    Ok(Response::builder(StatusCode::Ok)
        .body(html)
        .content_type(tide::http::mime::HTML)
        .build())
}

/**
 *  POST /vote
 *
 *  Form submissions from the HTML page land back on the index
 */
pub async fn vote_form(mut req: Request<AppState>) -> tide::Result {
    let payload = read_payload!(req);
    match crate::vote::vote_from_payload(&*req.state().store, &payload).await {
        Ok(_) => Ok(tide::Redirect::see_other("/").into()),
        Err(err) => vote_failed(err),
    }
}

pub mod questions {
    use log::*;
    use tide::{Request, Response, StatusCode};

    use super::*;
    use crate::validation;

    /**
     *  GET /api/polls
     */
    pub async fn list(req: Request<AppState>) -> tide::Result {
        let polls = req.state().store.list_polls().await?;
        json_response(StatusCode::Ok, &polls)
    }

    /**
     *  POST /api/polls
     */
    pub async fn create(mut req: Request<AppState>) -> tide::Result {
        let payload = read_payload!(req);
        let question = match validation::new_question(&payload) {
            Ok(question) => question,
            Err(errors) => return invalid(&errors),
        };

        let poll = req.state().store.create_poll(question).await?;
        info!("Created poll: {:?}", poll);
        json_response(StatusCode::Created, &poll)
    }

    /**
     *  GET /api/polls/:id
     */
    pub async fn get(req: Request<AppState>) -> tide::Result {
        let id = match id_param(&req) {
            Some(id) => id,
            None => return not_found(),
        };

        debug!("Fetching poll: {}", id);
        match req.state().store.get_poll(id).await? {
            Some(poll) => json_response(StatusCode::Ok, &poll),
            None => not_found(),
        }
    }

    /**
     *  PUT /api/polls/:id
     */
    pub async fn update(req: Request<AppState>) -> tide::Result {
        update_with(req, false).await
    }

    /**
     *  PATCH /api/polls/:id
     */
    pub async fn partial_update(req: Request<AppState>) -> tide::Result {
        update_with(req, true).await
    }

    async fn update_with(mut req: Request<AppState>, partial: bool) -> tide::Result {
        let id = match id_param(&req) {
            Some(id) => id,
            None => return not_found(),
        };
        let payload = read_payload!(req);
        let changes = match validation::question_changes(&payload, partial) {
            Ok(changes) => changes,
            Err(errors) => return invalid(&errors),
        };

        match req.state().store.update_question(id, changes).await? {
            Some(poll) => json_response(StatusCode::Ok, &poll),
            None => not_found(),
        }
    }

    /**
     *  DELETE /api/polls/:id
     */
    pub async fn delete(req: Request<AppState>) -> tide::Result {
        let id = match id_param(&req) {
            Some(id) => id,
            None => return not_found(),
        };

        if req.state().store.delete_question(id).await? {
            info!("Deleted poll {}", id);
            Ok(Response::new(StatusCode::NoContent))
        } else {
            not_found()
        }
    }

    /**
     *  POST /api/polls/vote
     */
    pub async fn vote(mut req: Request<AppState>) -> tide::Result {
        let payload = read_payload!(req);
        match crate::vote::vote_from_payload(&*req.state().store, &payload).await {
            Ok(choice) => json_response(StatusCode::Ok, &choice),
            Err(err) => vote_failed(err),
        }
    }
}

pub mod choices {
    use log::*;
    use tide::{Request, Response, StatusCode};

    use super::*;
    use crate::validation;

    /**
     *  GET /api/choices
     */
    pub async fn list(req: Request<AppState>) -> tide::Result {
        let choices = req.state().store.list_choices().await?;
        json_response(StatusCode::Ok, &choices)
    }

    /**
     *  POST /api/choices
     */
    pub async fn create(mut req: Request<AppState>) -> tide::Result {
        let payload = read_payload!(req);
        let choice = match validation::new_choice(&payload) {
            Ok(choice) => choice,
            Err(errors) => return invalid(&errors),
        };

        let question_id = choice.question_id;
        match req.state().store.create_choice(choice).await? {
            Some(choice) => {
                info!("Created choice: {:?}", choice);
                json_response(StatusCode::Created, &choice)
            }
            None => invalid(&FieldErrors::single(
                "question",
                validation::missing_pk(question_id),
            )),
        }
    }

    /**
     *  GET /api/choices/:id
     */
    pub async fn get(req: Request<AppState>) -> tide::Result {
        let id = match id_param(&req) {
            Some(id) => id,
            None => return not_found(),
        };

        match req.state().store.get_choice(id).await? {
            Some(choice) => json_response(StatusCode::Ok, &choice),
            None => not_found(),
        }
    }

    /**
     *  PUT /api/choices/:id
     */
    pub async fn update(req: Request<AppState>) -> tide::Result {
        update_with(req, false).await
    }

    /**
     *  PATCH /api/choices/:id
     */
    pub async fn partial_update(req: Request<AppState>) -> tide::Result {
        update_with(req, true).await
    }

    async fn update_with(mut req: Request<AppState>, partial: bool) -> tide::Result {
        let id = match id_param(&req) {
            Some(id) => id,
            None => return not_found(),
        };
        let payload = read_payload!(req);
        let changes = match validation::choice_changes(&payload, partial) {
            Ok(changes) => changes,
            Err(errors) => return invalid(&errors),
        };

        match req.state().store.update_choice(id, changes).await? {
            Some(choice) => json_response(StatusCode::Ok, &choice),
            None => not_found(),
        }
    }

    /**
     *  DELETE /api/choices/:id
     */
    pub async fn delete(req: Request<AppState>) -> tide::Result {
        let id = match id_param(&req) {
            Some(id) => id,
            None => return not_found(),
        };

        if req.state().store.delete_choice(id).await? {
            Ok(Response::new(StatusCode::NoContent))
        } else {
            not_found()
        }
    }
}
