//! Groth16 proof packing.
//!
//! A Groth16 proof is three curve points: `A` and `C` on G1, `B` on G2 whose
//! coordinates live in the quadratic extension `Fq2 = c0 + c1·u`. The packed
//! form flattens them into eight base-field integers in the order the EVM
//! verifier reads its calldata:
//!
//! ```text
//! [A.x, A.y, B.x.c1, B.x.c0, B.y.c1, B.y.c0, C.x, C.y]
//! ```
//!
//! Note the extension components of `B` are written imaginary part first.

use ark_bn254::Fq;
use ark_ff::PrimeField;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Number of integers in a packed proof.
pub const PACKED_LEN: usize = 8;

/// Bytes per calldata word.
pub const WORD_BYTES: usize = 32;

/// Errors that can occur while decoding proofs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Malformed proof: expected {expected} elements, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("Malformed proof: element {index} is not below the base field modulus")]
    OutOfField { index: usize },

    #[error("Malformed proof: {0}")]
    Encoding(String),
}

/// Modulus of the BN254 base field that proof coordinates live in.
pub fn base_field_modulus() -> BigUint {
    Fq::MODULUS.into()
}

/// Affine Groth16 proof as produced by the proving engine.
///
/// `b` follows the snarkjs layout: `b[0]` is the x coordinate, `b[1]` the y
/// coordinate, each as `[c0, c1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnarkjsProof", into = "SnarkjsProof")]
pub struct Groth16Proof {
    pub a: [BigUint; 2],
    pub b: [[BigUint; 2]; 2],
    pub c: [BigUint; 2],
}

/// Fixed-length packed proof.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PackedProof([BigUint; PACKED_LEN]);

impl PackedProof {
    /// Validate length and field range.
    pub fn new(elements: Vec<BigUint>) -> Result<Self, CodecError> {
        let modulus = base_field_modulus();
        if let Some(index) = elements.iter().position(|e| e >= &modulus) {
            return Err(CodecError::OutOfField { index });
        }
        let actual = elements.len();
        let elements: [BigUint; PACKED_LEN] = elements.try_into().map_err(|_| {
            CodecError::Length {
                expected: PACKED_LEN,
                actual,
            }
        })?;
        Ok(Self(elements))
    }

    pub fn elements(&self) -> &[BigUint; PACKED_LEN] {
        &self.0
    }

    /// 256-byte calldata: each element as a 32-byte big-endian word.
    pub fn to_calldata(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; PACKED_LEN * WORD_BYTES];
        for (element, word) in self.0.iter().zip(bytes.chunks_exact_mut(WORD_BYTES)) {
            let be = element.to_bytes_be();
            word[WORD_BYTES - be.len()..].copy_from_slice(&be);
        }
        bytes
    }

    pub fn from_calldata(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != PACKED_LEN * WORD_BYTES {
            return Err(CodecError::Length {
                expected: PACKED_LEN * WORD_BYTES,
                actual: bytes.len(),
            });
        }
        Self::new(
            bytes
                .chunks_exact(WORD_BYTES)
                .map(BigUint::from_bytes_be)
                .collect(),
        )
    }
}

impl TryFrom<Vec<String>> for PackedProof {
    type Error = CodecError;

    fn try_from(strings: Vec<String>) -> Result<Self, Self::Error> {
        let elements = strings
            .iter()
            .map(|s| parse_decimal(s))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(elements)
    }
}

impl From<PackedProof> for Vec<String> {
    fn from(proof: PackedProof) -> Self {
        proof.0.iter().map(|e| e.to_str_radix(10)).collect()
    }
}

/// Flatten a proof into calldata order.
pub fn pack(proof: &Groth16Proof) -> PackedProof {
    let [ax, ay] = proof.a.clone();
    let [[bx0, bx1], [by0, by1]] = proof.b.clone();
    let [cx, cy] = proof.c.clone();
    PackedProof([ax, ay, bx1, bx0, by1, by0, cx, cy])
}

/// Inverse of [`pack`].
pub fn unpack(packed: &PackedProof) -> Groth16Proof {
    let [ax, ay, bx1, bx0, by1, by0, cx, cy] = packed.0.clone();
    Groth16Proof {
        a: [ax, ay],
        b: [[bx0, bx1], [by0, by1]],
        c: [cx, cy],
    }
}

/// Validate and unpack an untrusted element sequence.
pub fn unpack_elements(elements: Vec<BigUint>) -> Result<Groth16Proof, CodecError> {
    PackedProof::new(elements).map(|packed| unpack(&packed))
}

fn parse_decimal(s: &str) -> Result<BigUint, CodecError> {
    BigUint::parse_bytes(s.trim().as_bytes(), 10)
        .ok_or_else(|| CodecError::Encoding(format!("not a decimal integer: {:?}", s)))
}

/// snarkjs `proof.json` shape: projective coordinates as decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnarkjsProof {
    pi_a: Vec<String>,
    pi_b: Vec<Vec<String>>,
    pi_c: Vec<String>,
    #[serde(default = "default_protocol")]
    protocol: String,
    #[serde(default = "default_curve")]
    curve: String,
}

fn default_protocol() -> String {
    "groth16".to_string()
}

fn default_curve() -> String {
    "bn128".to_string()
}

/// Affine part of a snarkjs point; the optional trailing `z` must be 1.
fn affine_pair(point: &[String], label: &str) -> Result<[BigUint; 2], CodecError> {
    match point {
        [x, y] => Ok([parse_decimal(x)?, parse_decimal(y)?]),
        [x, y, z] if z.trim() == "1" => Ok([parse_decimal(x)?, parse_decimal(y)?]),
        _ => Err(CodecError::Encoding(format!(
            "{} is not an affine point",
            label
        ))),
    }
}

impl TryFrom<SnarkjsProof> for Groth16Proof {
    type Error = CodecError;

    fn try_from(raw: SnarkjsProof) -> Result<Self, Self::Error> {
        if raw.protocol != "groth16" {
            return Err(CodecError::Encoding(format!(
                "unsupported protocol {}",
                raw.protocol
            )));
        }
        let b = match raw.pi_b.as_slice() {
            [x, y] => [affine_pair(x, "pi_b.x")?, affine_pair(y, "pi_b.y")?],
            [x, y, z] if z.len() == 2 && z[0].trim() == "1" && z[1].trim() == "0" => {
                [affine_pair(x, "pi_b.x")?, affine_pair(y, "pi_b.y")?]
            }
            _ => return Err(CodecError::Encoding("pi_b is not an affine point".into())),
        };
        let proof = Self {
            a: affine_pair(&raw.pi_a, "pi_a")?,
            b,
            c: affine_pair(&raw.pi_c, "pi_c")?,
        };
        // coordinates must already be reduced, reported in packed order
        PackedProof::new(pack(&proof).0.to_vec())?;
        Ok(proof)
    }
}

impl From<Groth16Proof> for SnarkjsProof {
    fn from(proof: Groth16Proof) -> Self {
        let dec = |v: &BigUint| v.to_str_radix(10);
        Self {
            pi_a: vec![dec(&proof.a[0]), dec(&proof.a[1]), "1".into()],
            pi_b: vec![
                proof.b[0].iter().map(dec).collect(),
                proof.b[1].iter().map(dec).collect(),
                vec!["1".into(), "0".into()],
            ],
            pi_c: vec![dec(&proof.c[0]), dec(&proof.c[1]), "1".into()],
            protocol: default_protocol(),
            curve: default_curve(),
        }
    }
}

/// Serde adapter for big integers as decimal strings.
pub(crate) mod decimal {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigUint::parse_bytes(s.trim().as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("not a decimal integer: {:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: u64) -> BigUint {
        BigUint::from(v)
    }

    fn sample_proof() -> Groth16Proof {
        Groth16Proof {
            a: [n(1), n(2)],
            b: [[n(3), n(4)], [n(5), n(6)]],
            c: [n(7), n(8)],
        }
    }

    #[test]
    fn test_pack_order_is_pinned() {
        let packed = pack(&sample_proof());
        let expected: Vec<BigUint> = [1u64, 2, 4, 3, 6, 5, 7, 8].iter().map(|&v| n(v)).collect();
        assert_eq!(packed.elements().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_unpack_inverts_pack() {
        let proof = sample_proof();
        assert_eq!(unpack(&pack(&proof)), proof);

        let packed = PackedProof::new((10..18).map(n).collect()).unwrap();
        assert_eq!(pack(&unpack(&packed)), packed);
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(
            unpack_elements((0..7).map(n).collect()),
            Err(CodecError::Length {
                expected: 8,
                actual: 7
            })
        );
        assert!(matches!(
            unpack_elements((0..9).map(n).collect()),
            Err(CodecError::Length { actual: 9, .. })
        ));
    }

    #[test]
    fn test_element_out_of_field() {
        let mut elements: Vec<BigUint> = (0..8).map(n).collect();
        elements[5] = base_field_modulus();
        assert_eq!(
            unpack_elements(elements.clone()),
            Err(CodecError::OutOfField { index: 5 })
        );

        elements[5] = base_field_modulus() - 1u32;
        assert!(unpack_elements(elements).is_ok());
    }

    #[test]
    fn test_base_field_modulus() {
        assert_eq!(
            base_field_modulus().to_str_radix(10),
            "21888242871839275222246405745257275088696311157297823662689037025744242208583"
        );
    }

    #[test]
    fn test_calldata_layout() {
        let packed = pack(&sample_proof());
        let calldata = packed.to_calldata();
        assert_eq!(calldata.len(), 256);
        assert_eq!(calldata[31], 1);
        assert_eq!(calldata[63], 2);
        assert_eq!(calldata[95], 4);
        assert!(calldata[..31].iter().all(|&b| b == 0));
        assert_eq!(PackedProof::from_calldata(&calldata).unwrap(), packed);
        assert!(matches!(
            PackedProof::from_calldata(&calldata[1..]),
            Err(CodecError::Length { .. })
        ));
    }

    #[test]
    fn test_snarkjs_json() {
        let json = r#"{
            "pi_a": ["1", "2", "1"],
            "pi_b": [["3", "4"], ["5", "6"], ["1", "0"]],
            "pi_c": ["7", "8", "1"],
            "protocol": "groth16",
            "curve": "bn128"
        }"#;
        let proof: Groth16Proof = serde_json::from_str(json).unwrap();
        assert_eq!(proof, sample_proof());

        let back = serde_json::to_string(&proof).unwrap();
        assert_eq!(serde_json::from_str::<Groth16Proof>(&back).unwrap(), proof);

        let packed_json = serde_json::to_string(&pack(&proof)).unwrap();
        assert_eq!(packed_json, r#"["1","2","4","3","6","5","7","8"]"#);
    }

    #[test]
    fn test_snarkjs_rejects_projective_point() {
        let json = r#"{"pi_a": ["1", "2", "5"], "pi_b": [["3", "4"], ["5", "6"]], "pi_c": ["7", "8"]}"#;
        assert!(serde_json::from_str::<Groth16Proof>(json).is_err());
    }

    #[test]
    fn test_snarkjs_rejects_unreduced_coordinate() {
        let json = format!(
            r#"{{"pi_a": ["1", "2", "1"], "pi_b": [["3", "{}"], ["5", "6"], ["1", "0"]], "pi_c": ["7", "8", "1"]}}"#,
            base_field_modulus()
        );
        let err = serde_json::from_str::<Groth16Proof>(&json).unwrap_err();
        assert!(err.to_string().contains("element 2 is not below the base field modulus"));

        let json = json.replace(&base_field_modulus().to_string(), "4");
        assert_eq!(serde_json::from_str::<Groth16Proof>(&json).unwrap(), sample_proof());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn element() -> impl Strategy<Value = BigUint> {
            prop::collection::vec(any::<u8>(), 0..32)
                .prop_map(|bytes| BigUint::from_bytes_be(&bytes) % base_field_modulus())
        }

        proptest! {
            #[test]
            fn packed_round_trip(elements in prop::collection::vec(element(), PACKED_LEN)) {
                let packed = PackedProof::new(elements).unwrap();
                prop_assert_eq!(pack(&unpack(&packed)), packed.clone());
                prop_assert_eq!(PackedProof::from_calldata(&packed.to_calldata()).unwrap(), packed);
            }
        }
    }
}
