use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::errors::ConfigError;


/// A named block of service hours.  Demand, frequencies, and unmet demand are all accounted at
/// this granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    AM,
    MID,
    PM,
    EVE,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::AM, Period::MID, Period::PM, Period::EVE];

    pub fn name(&self) -> &'static str {
        match self {
            Period::AM => "AM",
            Period::MID => "MID",
            Period::PM => "PM",
            Period::EVE => "EVE",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, ff: &mut fmt::Formatter) -> fmt::Result {
        write!(ff, "{}", self.name())
    }
}

impl FromStr for Period {
    type Err = ConfigError;

    fn from_str(ss: &str) -> Result<Period, ConfigError> {
        match ss.to_ascii_uppercase().as_str() {
            "AM" => Ok(Period::AM),
            "MID" => Ok(Period::MID),
            "PM" => Ok(Period::PM),
            "EVE" => Ok(Period::EVE),
            _ => Err(ConfigError::UnknownPeriod(String::from(ss))),
        }
    }
}


/// Maps hours of the day onto periods.  Every configured period owns at least one hour, and no
/// hour belongs to more than one period.  Hours not owned by any period are outside the modelled
/// service day.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodMap {
    hours: BTreeMap<Period, Vec<u8>>,
    hour_to_period: [Option<Period>; 24],
}

impl PeriodMap {
    pub fn new<II>(period_hours: II) -> Result<PeriodMap, ConfigError>
        where II: IntoIterator<Item = (Period, Vec<i64>)>
    {
        let mut hours = BTreeMap::new();
        let mut hour_to_period = [None; 24];
        for (period, raw_hours) in period_hours {
            if raw_hours.is_empty() {
                return Err(ConfigError::EmptyPeriod(period));
            }
            let mut period_hours = vec![];
            for raw_hour in raw_hours {
                if !(0..24).contains(&raw_hour) {
                    return Err(ConfigError::HourOutOfRange(raw_hour));
                }
                let hour = raw_hour as u8;
                match hour_to_period[hour as usize] {
                    Some(first) if first != period => {
                        return Err(ConfigError::OverlappingHour{hour, first, second: period});
                    }
                    // listing an hour twice under the same period is harmless
                    Some(_) => continue,
                    None => hour_to_period[hour as usize] = Some(period),
                }
                period_hours.push(hour);
            }
            period_hours.sort_unstable();
            hours.entry(period).or_insert_with(Vec::new).extend(period_hours);
        }
        return Ok(PeriodMap{hours, hour_to_period});
    }

    /// The periods and hours used by the reference network: AM 6-9, MID 10-14, PM 15-18,
    /// EVE 19-21.
    pub fn standard() -> PeriodMap {
        let mut hour_to_period = [None; 24];
        let mut hours = BTreeMap::new();
        for (period, range) in [(Period::AM, 6..10), (Period::MID, 10..15), (Period::PM, 15..19),
                                (Period::EVE, 19..22)] {
            let period_hours: Vec<u8> = range.collect();
            for hour in &period_hours {
                hour_to_period[*hour as usize] = Some(period);
            }
            hours.insert(period, period_hours);
        }
        return PeriodMap{hours, hour_to_period};
    }

    pub fn period_of(&self, hour: u8) -> Option<Period> {
        return self.hour_to_period.get(hour as usize).copied().flatten();
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.hours.keys().copied()
    }

    pub fn hours_in(&self, period: Period) -> &[u8] {
        match self.hours.get(&period) {
            Some(hours) => hours,
            None => &[],
        }
    }

    pub fn num_periods(&self) -> usize {
        self.hours.len()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_map() {
        let map = PeriodMap::standard();
        assert_eq!(map.period_of(6), Some(Period::AM));
        assert_eq!(map.period_of(9), Some(Period::AM));
        assert_eq!(map.period_of(14), Some(Period::MID));
        assert_eq!(map.period_of(18), Some(Period::PM));
        assert_eq!(map.period_of(21), Some(Period::EVE));
        assert_eq!(map.period_of(3), None);
        assert_eq!(map.period_of(22), None);
        assert_eq!(map.hours_in(Period::MID).len(), 5);
        let periods: Vec<Period> = map.periods().collect();
        assert_eq!(periods, Period::ALL.to_vec());
    }

    #[test]
    fn test_overlap_rejected() {
        let result = PeriodMap::new(vec![
            (Period::AM, vec![6, 7, 8]),
            (Period::PM, vec![8, 9]),
        ]);
        match result {
            Err(ConfigError::OverlappingHour{hour, first, second}) => {
                assert_eq!(hour, 8);
                assert_eq!(first, Period::AM);
                assert_eq!(second, Period::PM);
            }
            other => panic!("expected overlap error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_hours_rejected() {
        assert!(matches!(PeriodMap::new(vec![(Period::AM, vec![24])]),
                         Err(ConfigError::HourOutOfRange(24))));
        assert!(matches!(PeriodMap::new(vec![(Period::EVE, vec![])]),
                         Err(ConfigError::EmptyPeriod(Period::EVE))));
    }

    #[test]
    fn test_parse_period() {
        assert_eq!("am".parse::<Period>().unwrap(), Period::AM);
        assert_eq!("EVE".parse::<Period>().unwrap(), Period::EVE);
        assert!("NIGHT".parse::<Period>().is_err());
    }
}
