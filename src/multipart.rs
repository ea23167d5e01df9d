//! Minimal multipart/form-data encoder for the image upload endpoint.
//! crux_http carries the encoded body as raw bytes; the boundary travels in
//! the Content-Type header.

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundary: format!("----yardhopper-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    /// Content-Type header value for a request carrying this form.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn add_file_part(&mut self, name: &str, filename: &str, mime_type: &str, data: &[u8]) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
    }

    /// Appends the closing boundary and returns the finished body.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_carries_boundary() {
        let form = MultipartForm::new();
        let content_type = form.content_type();
        assert!(content_type.starts_with("multipart/form-data; boundary=----yardhopper-"));
    }

    #[test]
    fn boundaries_are_unique_per_form() {
        assert_ne!(
            MultipartForm::new().content_type(),
            MultipartForm::new().content_type()
        );
    }

    #[test]
    fn encodes_single_file_part() {
        let mut form = MultipartForm::new();
        let boundary = form.content_type();
        let boundary = boundary.rsplit('=').next().unwrap().to_string();

        form.add_file_part("image", "IMG_0042.jpg", "image/jpeg", &[0xFF, 0xD8]);
        let body = form.finish();
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with(&format!("--{boundary}\r\n")));
        assert!(text.contains(
            "Content-Disposition: form-data; name=\"image\"; filename=\"IMG_0042.jpg\"\r\n"
        ));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\n"));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
        // The raw bytes sit between the header block and the part terminator.
        assert!(body
            .windows(2)
            .any(|w| w == [0xFF, 0xD8]));
    }
}
