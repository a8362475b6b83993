// Composition root for the work_logs bounded context.
//
// Responsibilities:
// - Read config from environment.
// - Instantiate local storage and the remote collection.
// - Spawn the sync coordinator loop and the connectivity probe.
// - Expose the HTTP routes and the GraphQL schema.

pub mod config;
pub mod graphql;
pub mod http;
pub mod state;
