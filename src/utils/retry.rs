use anyhow::Result;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::time::sleep;

/// 连线层面的暂时性错误：逾时、连不上、交易所 5xx 或 429。
/// 其他错误（4xx、回应格式错误）重试也没用
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_timeout()
                || e.is_connect()
                || e.status().is_some_and(|s| s.is_server_error() || s.as_u16() == 429);
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            return matches!(
                e.kind(),
                ErrorKind::TimedOut
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            );
        }
        false
    })
}

/// 指数退避重试，交易所接口偶尔逾时或回 5xx 时使用。
/// 只有 [`is_transient`] 的错误会重试，其余直接返回。
///
/// # Arguments
/// * `max_retries` - 最大重试次数（不含首次请求，总共最多执行 max_retries + 1 次）
/// * `operation` - 异步操作闭包
pub async fn retry_with_backoff<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };
        if attempt >= max_retries || !is_transient(&err) {
            return Err(err);
        }

        // 1s, 2s, 4s ...
        let delay = Duration::from_secs(1 << attempt.min(6));
        log::warn!("请求失败（第 {} 次），{}s 后重试: {:#}", attempt + 1, delay.as_secs(), err);
        sleep(delay).await;
        attempt += 1;
    }
}
