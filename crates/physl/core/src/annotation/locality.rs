// PhySL
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use super::{Annotation, AnnotationError};
use crate::value::Value;

/// Which locality holds a shard, out of how many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalityInformation {
    pub locality_id: u32,
    pub num_localities: u32,
}

impl LocalityInformation {
    pub const KEY: &'static str = "locality";

    pub fn new(locality_id: u32, num_localities: u32) -> Self {
        Self { locality_id, num_localities }
    }

    pub fn as_annotation(&self) -> Annotation {
        Annotation::new(Self::KEY, vec![Value::from(self.locality_id as i64), Value::from(self.num_localities as i64)])
    }

    pub fn from_annotation(annotation: &Annotation) -> Result<Self, AnnotationError> {
        let nested = if annotation.key() == Self::KEY {
            annotation.clone()
        } else {
            annotation.find(Self::KEY).ok_or_else(|| AnnotationError::Missing(Self::KEY.to_string()))?
        };
        let invalid = |message: &str| AnnotationError::Invalid {
            key: Self::KEY.to_string(),
            message: message.to_string(),
        };
        match nested.data() {
            [id, count] => {
                let id = id.as_i64().and_then(|v| u32::try_from(v).ok()).ok_or_else(|| invalid("locality id must be a non-negative integer"))?;
                let count = count.as_i64().and_then(|v| u32::try_from(v).ok()).ok_or_else(|| invalid("locality count must be a non-negative integer"))?;
                if id >= count {
                    return Err(invalid("locality id must be less than the number of localities"));
                }
                Ok(Self::new(id, count))
            }
            _ => Err(invalid("expected a locality id and a locality count")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let info = LocalityInformation::new(1, 4);
        assert_eq!(LocalityInformation::from_annotation(&info.as_annotation()).unwrap(), info);

        let outer = Annotation::new("meta", vec![]).with(info.as_annotation());
        assert_eq!(LocalityInformation::from_annotation(&outer).unwrap(), info);
    }

    #[test]
    fn test_id_out_of_range() {
        let bad = Annotation::new(LocalityInformation::KEY, vec![Value::from(4_i64), Value::from(4_i64)]);
        assert!(LocalityInformation::from_annotation(&bad).is_err());
    }
}
