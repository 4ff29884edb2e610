//! Built-in system emission factors.
//!
//! Values are rounded published averages (UK DEFRA/DESNZ conversion
//! factors, IPCC AR5 GWPs, IEA grid averages, US EEIO spend factors). Users
//! override or extend them through custom factors.

use crate::category::EmissionCategory;
use crate::factors::{EmissionFactor, FactorLibrary, FactorTable};

const DEFRA: &str = "DEFRA";
const IPCC_AR5: &str = "IPCC AR5";
const IEA: &str = "IEA";
const EEIO: &str = "US EEIO";

fn defra(name: &str, unit: &str, factor: f64) -> EmissionFactor {
    EmissionFactor::new(name, unit, factor).with_source(DEFRA, 2023)
}

fn eeio(name: &str, factor: f64) -> EmissionFactor {
    EmissionFactor::new(name, "USD", factor).with_source(EEIO, 2022)
}

fn gas(name: &str, gwp: f64) -> EmissionFactor {
    EmissionFactor::gas(name, gwp)
        .with_unit("lb", gwp * 0.453_592_37)
        .with_source(IPCC_AR5, 2014)
}

fn grid(region: &str, kwh: f64) -> EmissionFactor {
    EmissionFactor::new(region, "kWh", kwh)
        .with_unit("MWh", kwh * 1000.0)
        .with_source(IEA, 2022)
        .with_region(region)
}

pub(crate) fn default_library() -> FactorLibrary {
    use EmissionCategory::*;

    FactorLibrary::new()
        .with_table(
            StationaryCombustion,
            FactorTable::list(vec![
                defra("Natural Gas", "cubic meters", 2.02)
                    .with_unit("kWh", 0.183)
                    .with_unit("therms", 5.36),
                defra("Diesel", "litres", 2.66).with_unit("gallons", 10.07),
                defra("Heating Oil", "litres", 2.54),
                defra("LPG", "litres", 1.56).with_unit("kg", 2.94),
                defra("Coal", "tonnes", 2403.0).with_unit("kg", 2.403),
                defra("Wood Pellets", "tonnes", 51.6),
            ]),
        )
        .with_table(
            MobileCombustion,
            FactorTable::list(vec![
                defra("Petrol", "litres", 2.35).with_unit("gallons", 8.89),
                defra("Diesel", "litres", 2.66).with_unit("gallons", 10.07),
                defra("Jet Fuel", "litres", 2.54),
                defra("Average Car", "km", 0.168).with_unit("miles", 0.271),
                defra("HGV", "km", 0.905),
            ]),
        )
        .with_table(
            ProcessEmissions,
            FactorTable::list(vec![
                EmissionFactor::new("Cement Clinker", "tonnes", 525.0).with_source(IPCC_AR5, 2014),
                EmissionFactor::new("Lime", "tonnes", 750.0).with_source(IPCC_AR5, 2014),
                EmissionFactor::new("Ammonia", "tonnes", 1694.0).with_source(IPCC_AR5, 2014),
            ]),
        )
        .with_table(
            FugitiveEmissions,
            FactorTable::list(vec![
                gas("R-410A", 1924.0),
                gas("R-134a", 1300.0),
                gas("R-32", 677.0),
                gas("R-404A", 3943.0),
                gas("HFC-23", 12400.0),
                gas("SF6", 23500.0),
                gas("CO2", 1.0),
            ]),
        )
        .with_table(
            OnSiteWaste,
            FactorTable::list(vec![
                defra("Landfill", "tonnes", 467.0),
                defra("Incineration", "tonnes", 21.3),
                defra("Composting", "tonnes", 8.9),
                defra("Anaerobic Digestion", "tonnes", 8.9),
            ]),
        )
        .with_table(
            PurchasedEnergy,
            FactorTable::list(vec![
                grid("Global Average", 0.475),
                grid("United States", 0.386),
                grid("European Union", 0.251),
                grid("United Kingdom", 0.207),
                grid("Germany", 0.364),
                grid("France", 0.056),
                grid("China", 0.581),
                grid("India", 0.713),
                grid("Japan", 0.457),
                grid("Australia", 0.656),
                grid("Canada", 0.128),
                grid("Brazil", 0.103),
            ]),
        )
        .with_table(
            PurchasedGoodsServices,
            FactorTable::structured(
                vec![
                    defra("Steel", "kg", 1.85).with_unit("tonnes", 1850.0),
                    defra("Aluminium", "kg", 8.24).with_unit("tonnes", 8240.0),
                    defra("Plastics", "kg", 3.12).with_unit("tonnes", 3120.0),
                    defra("Paper", "kg", 0.92).with_unit("tonnes", 920.0),
                    defra("Concrete", "kg", 0.13).with_unit("tonnes", 131.0),
                    defra("Glass", "kg", 1.40).with_unit("tonnes", 1400.0),
                ],
                vec![
                    eeio("Manufactured Goods", 0.45),
                    eeio("Professional Services", 0.12),
                    eeio("IT Services", 0.15),
                    eeio("Food and Beverages", 0.82),
                    eeio("Office Supplies", 0.31),
                ],
            ),
        )
        .with_table(
            CapitalGoods,
            FactorTable::structured(
                vec![
                    defra("Laptop", "unit", 250.0),
                    defra("Server", "unit", 1200.0),
                    defra("Vehicle", "unit", 6000.0),
                ],
                vec![
                    eeio("Machinery", 0.42),
                    eeio("Buildings", 0.35),
                    eeio("Computer Equipment", 0.24),
                ],
            ),
        )
        .with_table(
            FuelEnergyRelated,
            FactorTable::list(vec![
                defra("Natural Gas Well-to-Tank", "cubic meters", 0.34).with_unit("kWh", 0.031),
                defra("Diesel Well-to-Tank", "litres", 0.61),
                defra("Petrol Well-to-Tank", "litres", 0.59),
                defra("Electricity T&D Losses", "kWh", 0.018),
                defra("Electricity Well-to-Tank", "kWh", 0.046),
            ]),
        )
        .with_table(UpstreamTransportation, transport_table())
        .with_table(
            WasteGenerated,
            FactorTable::list(vec![
                defra("Mixed Waste to Landfill", "tonnes", 467.0),
                defra("Mixed Recycling", "tonnes", 21.3),
                defra("Incineration", "tonnes", 21.3),
                defra("Composting", "tonnes", 8.9),
                defra("Wastewater", "cubic meters", 0.27),
            ]),
        )
        .with_table(
            BusinessTravel,
            FactorTable::structured(
                vec![
                    defra("Short-haul Flight", "passenger-km", 0.153),
                    defra("Long-haul Flight", "passenger-km", 0.195),
                    defra("Rail", "passenger-km", 0.035),
                    defra("Car", "km", 0.168),
                    defra("Taxi", "km", 0.149),
                    defra("Hotel Stay", "room-nights", 10.4),
                ],
                vec![
                    eeio("Air Travel", 1.02),
                    eeio("Ground Transport", 0.48),
                    eeio("Accommodation", 0.19),
                ],
            ),
        )
        .with_table(
            EmployeeCommuting,
            FactorTable::list(vec![
                defra("Car", "km", 0.168),
                defra("Bus", "passenger-km", 0.097),
                defra("Rail", "passenger-km", 0.035),
                defra("Motorbike", "km", 0.114),
                defra("Homeworking", "employee-days", 0.34),
            ]),
        )
        .with_table(
            UpstreamLeasedAssets,
            FactorTable::list(vec![
                defra("Leased Office", "square meters", 55.0),
                defra("Leased Warehouse", "square meters", 32.0),
            ]),
        )
        .with_table(DownstreamTransportation, transport_table())
        .with_table(
            ProcessingSoldProducts,
            FactorTable::list(vec![
                defra("Metal Processing", "tonnes", 320.0),
                defra("Food Processing", "tonnes", 150.0),
                defra("Plastics Processing", "tonnes", 410.0),
            ]),
        )
        .with_table(
            UseOfSoldProducts,
            FactorTable::list(vec![
                EmissionFactor::new("Electricity Use", "kWh", 0.475).with_source(IEA, 2022),
                defra("Petrol Combusted", "litres", 2.35),
                defra("Natural Gas Combusted", "cubic meters", 2.02),
            ]),
        )
        .with_table(
            EndOfLifeTreatment,
            FactorTable::list(vec![
                defra("Landfill", "tonnes", 467.0),
                defra("Recycling", "tonnes", 21.3),
                defra("Incineration", "tonnes", 21.3),
            ]),
        )
        .with_table(
            DownstreamLeasedAssets,
            FactorTable::list(vec![
                defra("Leased Office", "square meters", 55.0),
                defra("Leased Retail", "square meters", 85.0),
            ]),
        )
        .with_table(
            Franchises,
            FactorTable::list(vec![
                defra("Franchise Store", "square meters", 95.0),
                defra("Franchise Restaurant", "square meters", 210.0),
            ]),
        )
        .with_table(
            Investments,
            FactorTable::structured(
                vec![EmissionFactor::new("Investee Emissions", "kg CO2e", 1.0)],
                vec![
                    eeio("Listed Equity", 0.18),
                    eeio("Corporate Bonds", 0.15),
                    eeio("Project Finance", 0.35),
                ],
            ),
        )
}

fn transport_table() -> FactorTable {
    FactorTable::structured(
        vec![
            defra("Road Freight", "tonne-km", 0.107),
            defra("Rail Freight", "tonne-km", 0.028),
            defra("Sea Freight", "tonne-km", 0.016),
            defra("Air Freight", "tonne-km", 0.602),
        ],
        vec![eeio("Freight Services", 0.35), eeio("Warehousing", 0.21)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CalculationMethod;
    use crate::factors::FactorLookup;

    #[test]
    fn every_category_has_a_table() {
        let lib = default_library();
        for category in EmissionCategory::ALL {
            let table = lib.table(category);
            assert!(
                table.map(|t| !t.is_empty()).unwrap_or(false),
                "no factors for {category}"
            );
        }
    }

    #[test]
    fn defaults_are_system_factors() {
        let lib = default_library();
        assert_eq!(lib.custom_factors().count(), 0);
    }

    #[test]
    fn grid_factors_cover_kwh_and_mwh() {
        let lib = default_library();
        let kwh = lib.resolve(
            EmissionCategory::PurchasedEnergy,
            CalculationMethod::Activity,
            "United Kingdom",
            "kWh",
        );
        let mwh = lib.resolve(
            EmissionCategory::PurchasedEnergy,
            CalculationMethod::Activity,
            "United Kingdom",
            "MWh",
        );
        match (kwh, mwh) {
            (FactorLookup::Found { value: a, .. }, FactorLookup::Found { value: b, .. }) => {
                assert!((a * 1000.0 - b).abs() < 1e-9)
            }
            other => panic!("unexpected lookups {other:?}"),
        }
    }

    #[test]
    fn fugitive_gases_carry_gwp() {
        let lib = default_library();
        let table = lib.table(EmissionCategory::FugitiveEmissions).unwrap();
        assert!(table.entries().all(|(_, f)| f.gwp.is_some()));
    }
}
