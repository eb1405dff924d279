use ft_domain::AgentSymbol;

/// Scope for store operations that are per-agent. World data (systems,
/// markets, shipyards, construction sites) is shared between agents and
/// doesn't take a context.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub agent_symbol: AgentSymbol,
}

impl Ctx {
    pub fn for_agent(agent_symbol: AgentSymbol) -> Self {
        Self { agent_symbol }
    }
}
