use std::future::Future;
use std::pin::Pin;

/// Result of invoking a user callback that may complete immediately or
/// require awaiting further work — spec.md §9's "resumable result". A
/// systems-language stand-in for Python's "callback may return a coroutine"
/// contract: the caller checks which variant it got and awaits only when
/// necessary, following the teacher's existing convention of returning
/// `Pin<Box<dyn Future<Output = ...> + Send>>` from async trait methods
/// (`server-api`'s `TopicStorage`/`TopicSink`/`TopicSource`).
pub enum Outcome<T> {
    Value(T),
    Pending(Pin<Box<dyn Future<Output = T> + Send>>),
}

impl<T> Outcome<T> {
    pub async fn resolve(self) -> T {
        match self {
            Outcome::Value(v) => v,
            Outcome::Pending(fut) => fut.await,
        }
    }
}

impl<T> From<T> for Outcome<T> {
    fn from(value: T) -> Self {
        Outcome::Value(value)
    }
}
