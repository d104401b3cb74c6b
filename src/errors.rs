use snafu::Snafu;

pub type CustomResult<T> = Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// the event or snapshot entry carried no username, so it cannot be
    /// keyed into the leaderboard
    #[snafu(display("leaderboard entry is missing a username"))]
    MissingUsernameError,

    #[snafu(display("failed to fetch leaderboard snapshot: {message}"))]
    SnapshotFetchError { message: String },

    #[snafu(display("subscription to the {stream} stream failed: {message}"))]
    SubscriptionError { stream: String, message: String },

    #[snafu(display("file does not exist: {path}"))]
    FileDoesNotExistError { path: String },

    #[snafu(display("could not parse feed file: {message}"))]
    MalformedFeedFileError { message: String },
}
