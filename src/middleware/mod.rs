/*
 * Responsibility
 * - middleware の公開インターフェース
 * - gatekeeper (session gate), cors, http (request-id/trace/limit/timeout + security headers)
 */
pub mod cors;
pub mod gatekeeper;
pub mod http;
