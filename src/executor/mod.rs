mod executor;
mod default_executor;
mod jobs;
mod path_resolver;
mod redirect;

pub use executor::{ChildExit, ExecError, ExecStatus, Executor, ExitState, LaunchReport};
pub use default_executor::{DefaultExecutor, EXEC_FAILURE_STATUS, REDIRECT_FAILURE_STATUS};
pub use jobs::{BackgroundJob, JobState, JobTable};
pub use path_resolver::{is_executable_regular_file, PathResolver, ResolveError, DEFAULT_SEARCH_DIRS};
