use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::gateway::{run_gateway, AppState};
use crate::llm::OpenAiCompatModel;
use crate::pipeline::{self, ChatRequest, Pipeline};
use crate::retrieval::KeywordIndex;
use crate::storage::{ConversationStore, SqliteStore};
use crate::tools::{HttpInvoker, ToolRegistry};
use anyhow::Result;
use std::sync::Arc;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Serve { host, port } => {
            let (pipeline, store) = assemble(&config).await?;
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            run_gateway(&host, port, AppState { pipeline, store }).await
        }
        Command::Ask { message, thread } => {
            let (pipeline, _store) = assemble(&config).await?;
            let thread_id = thread.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let request = ChatRequest { thread_id, message };

            let (sink, mut rx) = pipeline::channel();
            let printer = async {
                while let Some(event) = rx.recv().await {
                    print!("{}", event.to_ndjson());
                }
            };
            tokio::join!(pipeline.run(request, sink), printer);
            Ok(())
        }
        Command::Threads => {
            let store = SqliteStore::connect(&config.database_path()).await?;
            for thread in store.list_threads().await? {
                println!("{}  {}  {}", thread.thread_id, thread.last_updated, thread.title);
            }
            Ok(())
        }
    }
}

/// Wire the pipeline from its collaborators: the keyword index over the tool
/// catalog, the chat-completions model, the HTTP invoker and the SQLite
/// store.
async fn assemble(config: &Config) -> Result<(Arc<Pipeline>, Arc<dyn ConversationStore>)> {
    let registry = Arc::new(ToolRegistry::from_catalog()?);

    let retriever = Arc::new(KeywordIndex::new(
        registry.documentation(),
        config.retrieval.top_k,
    ));
    let model = Arc::new(OpenAiCompatModel::new(
        config.model.base_url.as_str(),
        config.model.api_key.clone(),
        config.model.model.as_str(),
        config.model.temperature,
    ));
    let invoker = Arc::new(HttpInvoker::new(
        config.api.base_url.as_str(),
        config.api.api_key.clone(),
        registry,
    ));
    let store: Arc<dyn ConversationStore> =
        Arc::new(SqliteStore::connect(&config.database_path()).await?);

    let pipeline = Arc::new(Pipeline::new(retriever, model, invoker, store.clone()));
    Ok((pipeline, store))
}
