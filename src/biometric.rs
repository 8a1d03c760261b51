//! Biometric capability probe.
//!
//! A terminal has no sensor of its own, so the default probe reports no
//! hardware. A simulated sensor can be enabled from the prefs file to exercise
//! the enrollment prompt and biometric sign-in.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationType {
  Fingerprint,
  FacialRecognition,
  Iris,
}

impl AuthenticationType {
  pub fn from_config(s: &str) -> Option<Self> {
    match s.to_lowercase().as_str() {
      "fingerprint" => Some(AuthenticationType::Fingerprint),
      "face" | "faceid" | "facial" => Some(AuthenticationType::FacialRecognition),
      "iris" => Some(AuthenticationType::Iris),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiometricCapabilities {
  pub is_available: bool,
  pub has_hardware: bool,
  pub is_enrolled: bool,
  pub supported_types: Vec<AuthenticationType>,
  pub biometric_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiometricAuthResult {
  pub success: bool,
  pub error: Option<String>,
  pub biometric_type: Option<String>,
}

/// User-facing name for the strongest supported biometric.
pub fn biometric_type_name(types: &[AuthenticationType]) -> &'static str {
  if types.is_empty() {
    "Not Available"
  } else if types.contains(&AuthenticationType::FacialRecognition) {
    "Face ID"
  } else if types.contains(&AuthenticationType::Fingerprint) {
    "Fingerprint"
  } else if types.contains(&AuthenticationType::Iris) {
    "Iris Recognition"
  } else {
    "Biometric Authentication"
  }
}

pub trait BiometricProbe {
  fn has_hardware(&self) -> bool;
  fn is_enrolled(&self) -> bool;
  fn supported_types(&self) -> Vec<AuthenticationType>;
  /// Run the platform prompt. `Err` carries the platform's rejection reason.
  fn prompt(&self) -> Result<(), String>;

  fn check_capabilities(&self) -> BiometricCapabilities {
    let has_hardware = self.has_hardware();
    let is_enrolled = self.is_enrolled();
    let supported_types = self.supported_types();
    BiometricCapabilities {
      is_available: has_hardware && is_enrolled,
      has_hardware,
      is_enrolled,
      biometric_type: biometric_type_name(&supported_types).to_string(),
      supported_types,
    }
  }

  fn authenticate(&self) -> BiometricAuthResult {
    let capabilities = self.check_capabilities();
    if !capabilities.is_available {
      let error = if capabilities.has_hardware {
        "No biometric authentication is enrolled on this device"
      } else {
        "Biometric hardware is not available on this device"
      };
      return BiometricAuthResult { success: false, error: Some(error.to_string()), biometric_type: None };
    }
    match self.prompt() {
      Ok(()) => BiometricAuthResult { success: true, error: None, biometric_type: Some(capabilities.biometric_type) },
      Err(reason) => {
        debug!(reason = %reason, "biometric prompt rejected");
        BiometricAuthResult { success: false, error: Some(reason), biometric_type: None }
      }
    }
  }
}

/// The default: no sensor at all.
pub struct NoHardware;

impl BiometricProbe for NoHardware {
  fn has_hardware(&self) -> bool {
    false
  }

  fn is_enrolled(&self) -> bool {
    false
  }

  fn supported_types(&self) -> Vec<AuthenticationType> {
    Vec::new()
  }

  fn prompt(&self) -> Result<(), String> {
    Err("Authentication failed".to_string())
  }
}

/// A sensor that always has hardware and answers prompts with a fixed verdict.
pub struct SimulatedSensor {
  pub kind: AuthenticationType,
  pub enrolled: bool,
  pub accept: bool,
}

impl BiometricProbe for SimulatedSensor {
  fn has_hardware(&self) -> bool {
    true
  }

  fn is_enrolled(&self) -> bool {
    self.enrolled
  }

  fn supported_types(&self) -> Vec<AuthenticationType> {
    vec![self.kind]
  }

  fn prompt(&self) -> Result<(), String> {
    if self.accept { Ok(()) } else { Err("Authentication failed".to_string()) }
  }
}

/// Pick the probe described by the `simulated_biometric` preference.
pub fn probe_from_config(setting: Option<&str>) -> Box<dyn BiometricProbe> {
  match setting.and_then(AuthenticationType::from_config) {
    Some(kind) => Box::new(SimulatedSensor { kind, enrolled: true, accept: true }),
    None => Box::new(NoHardware),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn type_name_prefers_face_then_fingerprint() {
    use AuthenticationType::*;
    assert_eq!(biometric_type_name(&[]), "Not Available");
    assert_eq!(biometric_type_name(&[Fingerprint, FacialRecognition]), "Face ID");
    assert_eq!(biometric_type_name(&[Iris, Fingerprint]), "Fingerprint");
    assert_eq!(biometric_type_name(&[Iris]), "Iris Recognition");
  }

  #[test]
  fn no_hardware_reports_unavailable() {
    let caps = NoHardware.check_capabilities();
    assert!(!caps.is_available);
    assert_eq!(caps.biometric_type, "Not Available");
    let result = NoHardware.authenticate();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Biometric hardware is not available on this device"));
  }

  #[test]
  fn unenrolled_sensor_explains_why() {
    let sensor = SimulatedSensor { kind: AuthenticationType::Fingerprint, enrolled: false, accept: true };
    let result = sensor.authenticate();
    assert_eq!(result.error.as_deref(), Some("No biometric authentication is enrolled on this device"));
  }

  #[test]
  fn enrolled_sensor_authenticates() {
    let sensor = SimulatedSensor { kind: AuthenticationType::FacialRecognition, enrolled: true, accept: true };
    let result = sensor.authenticate();
    assert!(result.success);
    assert_eq!(result.biometric_type.as_deref(), Some("Face ID"));
  }

  #[test]
  fn rejected_prompt_is_not_fatal() {
    let sensor = SimulatedSensor { kind: AuthenticationType::Iris, enrolled: true, accept: false };
    let result = sensor.authenticate();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Authentication failed"));
  }

  #[test]
  fn probe_from_config_defaults_to_no_hardware() {
    assert!(!probe_from_config(None).has_hardware());
    assert!(!probe_from_config(Some("retina")).has_hardware());
    assert!(probe_from_config(Some("Fingerprint")).check_capabilities().is_available);
  }
}
