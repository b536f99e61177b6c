use crate::config::PveConfig;
use crate::errors::ToolError;
use crate::managers::container::{ContainerManager, CONTAINER_TOOLS};
use crate::managers::host::{HostManager, HOST_TOOLS};
use crate::managers::transfer::{TransferManager, TRANSFER_TOOLS};
use crate::mcp::catalog::tool_catalog;
use crate::services::logger::Logger;
use crate::services::session::SshSession;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::validation::Validation;
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: PveConfig,
    pub session: Arc<SshSession>,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    /// Load and validate configuration, connect the session once, and wire
    /// every tool to its manager. Configuration and connection failures here
    /// are the only fatal errors in the process.
    pub async fn initialize() -> Result<Self, ToolError> {
        let config = PveConfig::from_env();
        config.validate()?;

        let logger = Logger::new("pve-mcp");
        let validation = Validation::new();

        let session = Arc::new(SshSession::new(logger.clone(), config.target()));
        session.connect().await?;
        logger.info(
            &format!("Connected to Proxmox host: {}", config.host),
            None,
        );

        let container_manager = Arc::new(ContainerManager::new(
            logger.clone(),
            validation.clone(),
            session.clone(),
            config.character_limit,
        ));
        let host_manager = Arc::new(HostManager::new(
            logger.clone(),
            validation.clone(),
            session.clone(),
            config.enable_host_exec,
            config.character_limit,
        ));
        let transfer_manager = Arc::new(TransferManager::new(
            logger.clone(),
            validation,
            session.clone(),
            config.max_file_size,
            config.enable_host_exec,
        ));

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        for name in CONTAINER_TOOLS {
            handlers.insert((*name).to_string(), container_manager.clone());
        }
        for name in HOST_TOOLS {
            handlers.insert((*name).to_string(), host_manager.clone());
        }
        for name in TRANSFER_TOOLS {
            handlers.insert((*name).to_string(), transfer_manager.clone());
        }

        Self::validate_tool_wiring(&handlers)?;
        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers));

        Ok(Self {
            logger,
            config,
            session,
            tool_executor,
        })
    }

    fn validate_tool_wiring(
        handlers: &HashMap<String, Arc<dyn ToolHandler>>,
    ) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .filter(|tool| !handlers.contains_key(&tool.name))
            .map(|tool| tool.name.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_hint(
                "This is a server wiring bug: every tool in tool_catalog.json must have a handler.",
            )
            .with_details(serde_json::json!({ "missing_tools": missing })))
    }

    /// Release the session in sub-handle-then-connection order.
    pub async fn shutdown(&self) {
        self.session.disconnect().await;
        self.logger.info("Disconnected from Proxmox host", None);
    }
}
