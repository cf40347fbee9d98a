//! Argument binding for invokables
//!
//! Every dispatch builds an [`ArgEnv`] holding everything a handler could ask
//! for. A handler declares the parameters it wants at registration time and
//! receives only those, in declared order, as [`BoundArgs`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::{Aux, ChannelId, Command, PluginError, PluginResult};
use crate::plugin::PluginContext;

/// A parameter a handler can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// The plugin context
    Context,
    /// Channel the command arrived on
    ChannelId,
    /// The decoded command
    Command,
    /// The auxiliary bundle
    Aux,
}

impl Param {
    /// Every parameter, in environment order
    pub const ALL: [Param; 4] = [Param::Context, Param::ChannelId, Param::Command, Param::Aux];

    /// Name of the parameter as declared
    pub fn name(self) -> &'static str {
        match self {
            Param::Context => "context",
            Param::ChannelId => "channel_id",
            Param::Command => "command",
            Param::Aux => "aux",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "context" | "self" => Ok(Param::Context),
            "channel_id" => Ok(Param::ChannelId),
            "command" => Ok(Param::Command),
            "aux" => Ok(Param::Aux),
            other => Err(PluginError::other(format!("unknown parameter '{}'", other))),
        }
    }
}

/// A single bound argument
#[derive(Clone)]
pub enum Arg {
    Context(Arc<PluginContext>),
    ChannelId(ChannelId),
    Command(Command),
    Aux(Aux),
}

impl Arg {
    /// The parameter this argument was bound for
    pub fn param(&self) -> Param {
        match self {
            Arg::Context(_) => Param::Context,
            Arg::ChannelId(_) => Param::ChannelId,
            Arg::Command(_) => Param::Command,
            Arg::Aux(_) => Param::Aux,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Context(ctx) => f.debug_tuple("Context").field(&ctx.instance_id()).finish(),
            Arg::ChannelId(id) => f.debug_tuple("ChannelId").field(id).finish(),
            Arg::Command(cmd) => f.debug_tuple("Command").field(&cmd.name).finish(),
            Arg::Aux(aux) => f.debug_tuple("Aux").field(aux).finish(),
        }
    }
}

/// Everything available to a handler for one dispatch
pub struct ArgEnv {
    context: Arc<PluginContext>,
    channel_id: ChannelId,
    command: Command,
    aux: Aux,
}

impl ArgEnv {
    pub fn new(context: Arc<PluginContext>, channel_id: ChannelId, command: Command, aux: Aux) -> Self {
        Self {
            context,
            channel_id,
            command,
            aux,
        }
    }

    fn arg(&self, param: Param) -> Arg {
        match param {
            Param::Context => Arg::Context(Arc::clone(&self.context)),
            Param::ChannelId => Arg::ChannelId(self.channel_id),
            Param::Command => Arg::Command(self.command.clone()),
            Param::Aux => Arg::Aux(self.aux.clone()),
        }
    }

    /// Select the declared parameters, in declared order
    pub fn bind(&self, params: &[Param]) -> BoundArgs {
        BoundArgs {
            args: params.iter().map(|p| self.arg(*p)).collect(),
        }
    }
}

/// Arguments handed to a handler
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    args: Vec<Arg>,
}

impl BoundArgs {
    /// Number of bound arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Positional access
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter()
    }

    /// Parameters that were bound, in order
    pub fn params(&self) -> Vec<Param> {
        self.args.iter().map(Arg::param).collect()
    }

    /// The plugin context
    pub fn context(&self) -> PluginResult<Arc<PluginContext>> {
        self.args
            .iter()
            .find_map(|a| match a {
                Arg::Context(ctx) => Some(Arc::clone(ctx)),
                _ => None,
            })
            .ok_or_else(|| undeclared(Param::Context))
    }

    /// The channel the command arrived on
    pub fn channel_id(&self) -> PluginResult<ChannelId> {
        self.args
            .iter()
            .find_map(|a| match a {
                Arg::ChannelId(id) => Some(*id),
                _ => None,
            })
            .ok_or_else(|| undeclared(Param::ChannelId))
    }

    /// The decoded command
    pub fn command(&self) -> PluginResult<&Command> {
        self.args
            .iter()
            .find_map(|a| match a {
                Arg::Command(cmd) => Some(cmd),
                _ => None,
            })
            .ok_or_else(|| undeclared(Param::Command))
    }

    /// The auxiliary bundle
    pub fn aux(&self) -> PluginResult<&Aux> {
        self.args
            .iter()
            .find_map(|a| match a {
                Arg::Aux(aux) => Some(aux),
                _ => None,
            })
            .ok_or_else(|| undeclared(Param::Aux))
    }
}

fn undeclared(param: Param) -> PluginError {
    PluginError::other(format!("handler did not declare '{}'", param.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginConfig;
    use crate::host::{HostConfig, LocalHost};
    use serde_json::json;

    fn env() -> ArgEnv {
        let host = Arc::new(LocalHost::new(HostConfig::default()));
        let context = Arc::new(PluginContext::new(host, PluginConfig::default()));
        let command = Command::decode(r#"{"name":"compute"}"#).unwrap();
        ArgEnv::new(context, 11, command, Some(json!({"k": 1})))
    }

    #[test]
    fn test_param_names_round_trip() {
        for param in Param::ALL {
            assert_eq!(param.name().parse::<Param>().unwrap(), param);
        }
        assert_eq!("self".parse::<Param>().unwrap(), Param::Context);
        assert!("bogus".parse::<Param>().is_err());
    }

    #[test]
    fn test_bind_only_declared() {
        let args = env().bind(&[Param::Context, Param::ChannelId]);

        assert_eq!(args.len(), 2);
        assert_eq!(args.params(), vec![Param::Context, Param::ChannelId]);
        assert_eq!(args.channel_id().unwrap(), 11);
        assert!(args.command().is_err());
        assert!(args.aux().is_err());
    }

    #[test]
    fn test_bind_all_in_order() {
        let args = env().bind(&Param::ALL);

        assert_eq!(args.len(), 4);
        assert!(matches!(args.get(0), Some(Arg::Context(_))));
        assert!(matches!(args.get(1), Some(Arg::ChannelId(11))));
        assert!(matches!(args.get(2), Some(Arg::Command(c)) if c.name == "compute"));
        assert!(matches!(args.get(3), Some(Arg::Aux(Some(_)))));
    }

    #[test]
    fn test_bind_follows_declared_order() {
        let args = env().bind(&[Param::Aux, Param::ChannelId]);
        assert_eq!(args.params(), vec![Param::Aux, Param::ChannelId]);
        assert_eq!(args.aux().unwrap(), &Some(json!({"k": 1})));
    }

    #[test]
    fn test_bind_nothing() {
        let args = env().bind(&[]);
        assert!(args.is_empty());
        assert!(args.context().is_err());
    }
}
