//! Shared fixtures for integration tests
//!
//! A two-operation pets specification and a scripted generator that counts
//! how often the pipeline calls it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use synthmock::generation::{MockService, ResponseGenerator};
use synthmock::openapi::{ActiveSpec, EndpointIndex};
use synthmock::{MockError, Plan};

/// `GET /pets` → array of pets; `GET /pets/{id}` → pet or 404 error.
pub const PETS_SPEC: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: "1.0.0"
paths:
  /pets:
    get:
      operationId: listPets
      summary: List all pets
      responses:
        200:
          description: A list of pets
          content:
            application/json:
              schema:
                type: array
                items: { $ref: '#/components/schemas/Pet' }
  /pets/{id}:
    parameters:
      - { name: id, in: path, required: true, schema: { type: integer } }
    get:
      operationId: getPet
      responses:
        200:
          description: A pet
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Pet' }
        404:
          description: Not found
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Error' }
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id: { type: integer, format: int64 }
        name: { type: string }
        tag: { type: string, nullable: true }
    Error:
      type: object
      required: [code, message]
      properties:
        code: { type: integer }
        message: { type: string }
"#;

/// The same specification with a `default` error response on `GET /pets/{id}`.
pub fn pets_spec_with_default() -> String {
    PETS_SPEC.replace(
        "        404:\n          description: Not found",
        "        default:\n          description: Unexpected error",
    )
}

/// Records every prompt it is asked about; replies from a fixed script.
pub struct ScriptedGenerator {
    generate_reply: Box<dyn Fn(&Plan) -> String + Send + Sync>,
    repair_reply: String,
    pub generate_calls: Mutex<Vec<Plan>>,
    pub repair_calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn new(generate_reply: &str, repair_reply: &str) -> Arc<Self> {
        let reply = generate_reply.to_string();
        Self::with(move |_| reply.clone(), repair_reply)
    }

    pub fn with(
        generate_reply: impl Fn(&Plan) -> String + Send + Sync + 'static,
        repair_reply: &str,
    ) -> Arc<Self> {
        Arc::new(Self {
            generate_reply: Box::new(generate_reply),
            repair_reply: repair_reply.to_string(),
            generate_calls: Mutex::new(Vec::new()),
            repair_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn total_calls(&self) -> usize {
        self.generate_calls.lock().len() + self.repair_calls.lock().len()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, plan: &Plan) -> Result<String, MockError> {
        self.generate_calls.lock().push(plan.clone());
        Ok((self.generate_reply)(plan))
    }

    async fn repair(&self, invalid_json: &str, validation_error: &str) -> Result<String, MockError> {
        self.repair_calls
            .lock()
            .push((invalid_json.to_string(), validation_error.to_string()));
        Ok(self.repair_reply.clone())
    }
}

pub fn pets_service(generator: Arc<ScriptedGenerator>) -> MockService {
    let spec = Arc::new(ActiveSpec::new(EndpointIndex::from_text(PETS_SPEC)));
    MockService::new(spec, generator)
}
