pub mod shared {
    pub mod core {
        pub mod primitives;
    }
    pub mod infrastructure {
        pub mod connectivity;
        pub mod key_value;
    }
}

pub mod modules {
    pub mod work_logs {
        pub mod core {
            pub mod entry;
            pub mod errors;
            pub mod projections;
            pub mod store;
            pub mod sync_state;
        }
        pub mod use_cases {
            pub mod export_csv {
                pub mod csv;
            }
            pub mod sync {
                pub mod coordinator;
                pub mod handle;
                pub mod outbox;
            }
            pub mod view_today {
                pub mod projection;
            }
        }
        pub mod adapters {
            pub mod inbound {
                pub mod graphql;
                pub mod http;
            }
            pub mod outbound {
                pub mod document_store_in_memory;
                pub mod feed_hub;
                pub mod local_storage;
                pub mod persistence;
            }
        }
    }
}

pub mod shell;

#[cfg(test)]
pub mod tests {
    pub mod fixtures;

    pub mod e2e {
        pub mod offline_first_tests;
    }
}
