use anyhow::Result;

/// Work on the pool that is run on a blocking thread.
pub trait PoolTask: Send + 'static {
    type Output: Send + 'static;

    fn run(self) -> Result<Self::Output>;
}
