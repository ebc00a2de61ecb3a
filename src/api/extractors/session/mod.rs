/*!
 * Session extractor
 *
 * Responsibility:
 * - gate が検証済みの SessionToken を handler に提供する
 * - 型は services::auth::token 側、ここは axum との接続だけ
 */

mod core;

pub use self::core::{CurrentSession, MaybeSession};
