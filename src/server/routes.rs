use crate::server::api;

pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    pub fn to_http_string(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status_code,
            self.status_text,
            self.content_type,
            self.body.len(),
            self.body
        )
    }

    fn json(body: String) -> Self {
        Self {
            status_code: 200,
            status_text: "OK",
            content_type: "application/json",
            body,
        }
    }
}

const JOBS_PREFIX: &str = "/api/jobs/";

pub fn route_request(method: &str, path: &str, body: &str) -> HttpResponse {
    let path = path.split('?').next().unwrap_or(path);
    match (method, path) {
        ("GET", "/api/health") => match api::health_payload() {
            Ok(payload) => HttpResponse::json(payload),
            Err(err) => error_response(500, "Internal Server Error", &err.to_string()),
        },
        ("GET", "/api/commanders") => match api::commanders_payload() {
            Ok(payload) => HttpResponse::json(payload),
            Err(err) => error_response(500, "Internal Server Error", &err.to_string()),
        },
        ("POST", "/api/battle") => api_response(api::battle_payload(body)),
        ("POST", "/api/simulate") => api_response(api::simulate_payload(body)),
        ("POST", "/api/jobs") => api_response(api::job_submit_payload(body)),
        (method, path) if path.starts_with(JOBS_PREFIX) => {
            let id = path.trim_start_matches(JOBS_PREFIX).trim_end_matches('/');
            match method {
                "GET" => api_response(api::job_status_payload(id)),
                "DELETE" => api_response(api::job_cancel_payload(id)),
                _ => error_response(405, "Method Not Allowed", "Use GET or DELETE on a job"),
            }
        }
        _ => error_response(404, "Not Found", "Route not found"),
    }
}

fn api_response(result: Result<String, api::ApiError>) -> HttpResponse {
    match result {
        Ok(payload) => HttpResponse::json(payload),
        Err(err) => {
            let (status_code, status_text) = err.status();
            if status_code >= 500 {
                tracing::error!(error = %err, "request failed");
            }
            error_response(status_code, status_text, &err.to_string())
        }
    }
}

fn error_response(status_code: u16, status_text: &'static str, message: &str) -> HttpResponse {
    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}
