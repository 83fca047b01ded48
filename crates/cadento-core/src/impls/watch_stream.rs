//! watch::Receiver を「現在値 + 変化ごと」のストリームに変換する

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::watch;

use crate::ports::RepositoryError;

/// 最初に現在値を射影して流し、以後は射影結果が変わったときだけ流す。
/// Sender が drop されたらストリームは終わる。
pub(crate) fn watch_stream<T, U, F>(
    rx: watch::Receiver<T>,
    project: F,
) -> BoxStream<'static, Result<U, RepositoryError>>
where
    T: Send + Sync + 'static,
    U: Clone + PartialEq + Send + 'static,
    F: FnMut(&T) -> U + Send + 'static,
{
    stream::unfold(
        (rx, project, None::<U>),
        |(mut rx, mut project, last)| async move {
            loop {
                if last.is_some() && rx.changed().await.is_err() {
                    return None;
                }
                let value = project(&rx.borrow_and_update());
                if last.as_ref() != Some(&value) {
                    return Some((Ok(value.clone()), (rx, project, Some(value))));
                }
            }
        },
    )
    .boxed()
}
