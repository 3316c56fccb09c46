use crate::{Parser, YamlError, YamlValue};

pub trait FromYaml: Sized {
    fn from_str(source: &str) -> Result<Self, YamlError> {
        let mut parser = Parser::new(source)?;
        let yaml_value = parser.parse()?;
        Self::from_yaml(&yaml_value)
    }

    fn from_yaml(value: &YamlValue) -> Result<Self, YamlError>;

    fn from_yaml_opt(value: Option<&YamlValue>, name: &str) -> Result<Self, YamlError> {
        match value {
            Some(v) => Self::from_yaml(v),
            None => Err(YamlError::Generic(format!("Missing required field: {}", name))),
        }
    }
}

impl FromYaml for String {
    fn from_yaml(value: &YamlValue) -> Result<Self, YamlError> {
        match value {
            YamlValue::Scalar(s) => Ok(s.to_string()),
            _ => Err(YamlError::Generic("Expected a scalar string".into())),
        }
    }
}

impl FromYaml for bool {
    fn from_yaml(v: &YamlValue) -> Result<Self, YamlError> {
        match v {
            YamlValue::Scalar(s) if s == "true" || s == "on" => Ok(true),
            YamlValue::Scalar(s) if s == "false" || s == "off" || s.is_empty() => Ok(false),
            _ => Err(YamlError::Generic("Invalid boolean".into())),
        }
    }
}

impl<T: FromYaml> FromYaml for Vec<T> {
    fn from_yaml(value: &YamlValue) -> Result<Self, YamlError> {
        match value {
            YamlValue::List(items) => items.iter().map(T::from_yaml).collect(),
            YamlValue::Scalar(s) if s.is_empty() => Ok(Vec::new()),
            _ => Ok(vec![T::from_yaml(value)?]),
        }
    }
}

impl<T: FromYaml> FromYaml for Option<T> {
    fn from_yaml(value: &YamlValue) -> Result<Self, YamlError> {
        T::from_yaml(value).map(Some)
    }

    fn from_yaml_opt(value: Option<&YamlValue>, _name: &str) -> Result<Self, YamlError> {
        match value {
            Some(v) => Self::from_yaml(v),
            None => Ok(None),
        }
    }
}

impl<K, V> FromYaml for std::collections::HashMap<K, V>
where
    K: std::str::FromStr + std::hash::Hash + Eq,
    V: FromYaml,
    K::Err: std::fmt::Display,
{
    fn from_yaml(value: &YamlValue) -> Result<Self, YamlError> {
        match value {
            YamlValue::Map(m) => {
                let mut map = std::collections::HashMap::new();
                for (k_str, v) in m {
                    let key = k_str
                        .parse::<K>()
                        .map_err(|e| YamlError::Generic(e.to_string()))?;
                    let val = V::from_yaml(v)?;
                    map.insert(key, val);
                }
                Ok(map)
            }
            YamlValue::Scalar(s) if s.is_empty() => Ok(std::collections::HashMap::new()),
            _ => Err(YamlError::Generic("Expected a Map".into())),
        }
    }
}

macro_rules! impl_from_yaml_numeric {
    ($($t:ty),*) => {
        $(
            impl FromYaml for $t {
                fn from_yaml(v: &YamlValue) -> Result<Self, YamlError> {
                    match v {
                        YamlValue::Scalar(s) => s
                            .parse::<$t>()
                            .map_err(|e| YamlError::Generic(format!("{} | {s}", e))),
                        _ => Err(YamlError::Generic(format!("Expected a numeric scalar for {}", stringify!($t)))),
                    }
                }
            }
        )*
    };
}

impl_from_yaml_numeric!(u16, u32, u64, usize, i32, i64, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_map() {
        let v = Parser::new("host: 127.0.0.1\nport: 8080").unwrap().parse().unwrap();
        assert_eq!(v.get("host").and_then(YamlValue::as_scalar), Some("127.0.0.1"));
        assert_eq!(u16::from_yaml(v.get("port").unwrap()).unwrap(), 8080);
    }

    #[test]
    fn parses_inline_list() {
        let v = Parser::new("ports: [8080, 8081]").unwrap().parse().unwrap();
        let ports = Vec::<u16>::from_yaml(v.get("ports").unwrap()).unwrap();
        assert_eq!(ports, vec![8080, 8081]);
    }

    #[test]
    fn bool_accepts_on_off() {
        assert!(bool::from_yaml(&YamlValue::Scalar("on".into())).unwrap());
        assert!(!bool::from_yaml(&YamlValue::Scalar("off".into())).unwrap());
        assert!(bool::from_yaml(&YamlValue::Scalar("nope".into())).is_err());
    }

    #[test]
    fn numeric_error_mentions_invalid_digit() {
        let e = u16::from_yaml(&YamlValue::Scalar("abc".into())).unwrap_err();
        assert!(format!("{e}").contains("invalid digit found in string"));
    }
}
