/*!
 * pollbooth is a small polling service: questions with choices, and an
 * endpoint to vote for a choice.
 */
use handlebars::Handlebars;
use std::sync::Arc;

pub mod api_models;
pub mod config;
pub mod models;
pub mod routes;
pub mod store;
pub mod validation;
pub mod vote;

use store::PollStore;

/**
 * Struct for carrying application state into tide request handlers
 */
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PollStore>,
    pub templates: Arc<Handlebars<'static>>,
}

impl AppState {
    pub fn new(store: Arc<dyn PollStore>) -> Result<Self, handlebars::TemplateError> {
        let mut templates = Handlebars::new();
        templates.register_template_string("index", include_str!("../templates/index.hbs"))?;

        Ok(Self {
            store,
            templates: Arc::new(templates),
        })
    }
}

/**
 * Build the tide application with every route mounted
 */
pub fn server(state: AppState) -> tide::Server<AppState> {
    use routes::{choices, questions};

    let mut app = tide::with_state(state);
    app.at("/").get(routes::index);
    app.at("/vote").post(routes::vote_form);

    // Browser clients call the API with trailing slashes, serve both spellings
    for slash in &["", "/"] {
        app.at(&format!("/api/polls{}", slash))
            .get(questions::list)
            .post(questions::create);
        app.at(&format!("/api/polls/vote{}", slash))
            .post(questions::vote);
        app.at(&format!("/api/polls/:id{}", slash))
            .get(questions::get)
            .put(questions::update)
            .patch(questions::partial_update)
            .delete(questions::delete);
        app.at(&format!("/api/choices{}", slash))
            .get(choices::list)
            .post(choices::create);
        app.at(&format!("/api/choices/:id{}", slash))
            .get(choices::get)
            .put(choices::update)
            .patch(choices::partial_update)
            .delete(choices::delete);
    }
    app
}
