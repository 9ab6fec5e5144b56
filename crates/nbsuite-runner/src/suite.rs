//! Suite assembly - turn loaded configuration into runnable groups

use crate::artifact::ArtifactPattern;
use crate::backend::CommandBackend;
use crate::discovery::DiscoveryOptions;
use crate::error::DiscoveryError;
use crate::exclusion::ExclusionRule;
use crate::group::{ArtifactSource, GroupDefinition, GroupPlan};
use crate::runner::{RunEvent, SuiteReport, SuiteRunner};
use nbsuite_config::{Config, GroupSource};

/// Every group of a suite with its backends, resolved against the base directory
#[derive(Debug, Clone)]
pub struct Suite {
    groups: Vec<GroupDefinition>,
    backends: Vec<CommandBackend>,
    options: DiscoveryOptions,
}

impl Suite {
    /// Build a suite for the platform this process runs on
    pub fn from_config(config: &Config) -> Self {
        Self::from_config_for_os(config, std::env::consts::OS)
    }

    /// Build a suite as it would run on `os`
    pub fn from_config_for_os(config: &Config, os: &str) -> Self {
        let groups = config
            .suite
            .groups
            .iter()
            .map(|group| {
                let source = match group.source() {
                    GroupSource::Discover { root, pattern } => ArtifactSource::Discover {
                        root: config.resolve(&root),
                        pattern: ArtifactPattern::extension(pattern),
                    },
                    GroupSource::Paths(paths) => {
                        ArtifactSource::Paths(paths.iter().map(|p| config.resolve(p)).collect())
                    }
                };

                let (active, inactive): (Vec<_>, Vec<_>) =
                    group.exclude.iter().partition(|rule| rule.is_active_on(os));

                GroupDefinition {
                    name: group.name.clone(),
                    backend: group.backend.clone(),
                    source,
                    rules: active.into_iter().map(ExclusionRule::from).collect(),
                    inactive_rules: inactive.into_iter().map(ExclusionRule::from).collect(),
                }
            })
            .collect();

        let backends = config
            .suite
            .backends
            .iter()
            .map(|(name, backend)| {
                CommandBackend::from_config(name.clone(), backend).with_current_dir(&config.base_dir)
            })
            .collect();

        Self {
            groups,
            backends,
            options: DiscoveryOptions {
                ignore_dirs: config.suite.ignore_dirs(),
                follow_links: config.suite.follow_links(),
            },
        }
    }

    /// Redirect backend stdout to stderr on every backend
    pub fn with_stdout_to_stderr(mut self, enabled: bool) -> Self {
        self.backends = self
            .backends
            .into_iter()
            .map(|b| b.with_stdout_to_stderr(enabled))
            .collect();
        self
    }

    /// Group definitions in execution order
    pub fn groups(&self) -> &[GroupDefinition] {
        &self.groups
    }

    /// Look up a backend by name
    pub fn backend(&self, name: &str) -> Option<&CommandBackend> {
        self.backends.iter().find(|b| b.name() == name)
    }

    /// Discovery settings shared by all groups
    pub fn discovery_options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Discover and filter every group.
    ///
    /// Fails on the first group whose root or explicit paths are missing,
    /// before any backend has been invoked.
    pub fn plan(&self) -> Result<Vec<GroupPlan>, DiscoveryError> {
        self.groups
            .iter()
            .map(|group| group.plan(&self.options))
            .collect()
    }

    /// A runner with every configured backend registered
    pub fn runner(&self) -> SuiteRunner {
        let mut runner = SuiteRunner::new();
        for backend in &self.backends {
            runner.register(backend.name(), Box::new(backend.clone()));
        }
        runner
    }

    /// Run planned groups in order
    pub fn run(&self, plans: Vec<GroupPlan>) -> SuiteReport {
        self.run_with(plans, |_| {})
    }

    /// Run planned groups, reporting progress to `observer`
    pub fn run_with<F>(&self, plans: Vec<GroupPlan>, observer: F) -> SuiteReport
    where
        F: FnMut(RunEvent<'_>),
    {
        self.runner().run_all(plans, observer)
    }
}
