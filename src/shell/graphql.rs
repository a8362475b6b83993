use async_graphql::{EmptySubscription, Schema};

pub use crate::modules::work_logs::adapters::inbound::graphql::{MutationRoot, QueryRoot};
pub use crate::shell::state::AppState;

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}
